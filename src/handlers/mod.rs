//! # Handlers de Conexión
//! src/handlers/mod.rs
//!
//! ```text
//! Listener → WorkQueue → Worker → Service ─┬─ FileHandler
//!                                          └─ ProxyHandler → relay ↔ upstream
//! ```
//!
//! El servicio se elige una vez al arrancar ([`Service::from_config`]) y el
//! worker lo invoca siempre igual a través de [`ConnectionHandler`].

pub mod files;
pub mod proxy;
pub mod relay;

pub use files::FileHandler;
pub use proxy::ProxyHandler;
pub use relay::{relay, RelayOutcome, Side};

use crate::config::{ServerConfig, ServiceMode};
use crate::error::HandlerError;
use crate::http::StatusCode;
use crate::metrics::{ConnectionResult, MetricsCollector};
use std::net::TcpStream;
use std::sync::Arc;

/// Cómo terminó una conexión atendida sin errores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Responded(StatusCode),
    Relayed(RelayOutcome),
}

impl From<Outcome> for ConnectionResult {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Responded(status) => ConnectionResult::Responded(status),
            Outcome::Relayed(relay) => ConnectionResult::Relayed {
                to_upstream: relay.to_upstream,
                to_client: relay.to_client,
            },
        }
    }
}

/// Atiende una conexión aceptada. El llamador es dueño del stream y lo
/// cierra cuando `handle` retorna, haya fallado o no.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn handle(&self, stream: &mut TcpStream) -> Result<Outcome, HandlerError>;
}

/// Servicio activo del proceso
pub enum Service {
    Files(FileHandler),
    Proxy(ProxyHandler),
}

impl Service {
    pub fn from_config(config: &ServerConfig, metrics: Arc<MetricsCollector>) -> Self {
        match &config.mode {
            ServiceMode::Files { root } => {
                Service::Files(FileHandler::new(root.clone(), config.buffer_size))
            }
            ServiceMode::Proxy(target) => Service::Proxy(ProxyHandler::new(
                target.clone(),
                config.buffer_size,
                metrics,
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Service::Files(_) => "files",
            Service::Proxy(_) => "proxy",
        }
    }
}

impl ConnectionHandler for Service {
    fn handle(&self, stream: &mut TcpStream) -> Result<Outcome, HandlerError> {
        match self {
            Service::Files(files) => files.serve(stream),
            Service::Proxy(proxy) => proxy.serve(stream),
        }
    }
}
