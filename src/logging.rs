//! # Logging estructurado
//! src/logging.rs
//!
//! Inicializa `tracing` con salida a stderr. El nivel se controla con
//! `RUST_LOG` (por ejemplo `RUST_LOG=pool_httpd=debug`).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filtro usado cuando `RUST_LOG` no está definido
pub const DEFAULT_FILTER: &str = "pool_httpd=info";

/// Instala el subscriber global. Llamadas repetidas no hacen nada.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true),
        )
        .try_init();
}
