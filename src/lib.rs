//! # pool_httpd
//! src/lib.rs
//!
//! Servidor HTTP/1.0 con un pool fijo de workers que consumen conexiones de
//! una cola bloqueante. Cada proceso corre uno de dos servicios: archivos
//! estáticos bajo un directorio raíz, o proxy TCP hacia un destino fijo.
//!
//! ## Arquitectura
//!
//! - `config`: argumentos CLI y configuración inmutable del servidor
//! - `server`: listener, cola de trabajo, pool de workers y shutdown
//! - `handlers`: servicio de archivos, proxy y relay bidireccional
//! - `http`: parsing de requests y escritura de responses HTTP/1.0
//! - `metrics`: contadores del servidor
//! - `error`, `logging`: taxonomía de errores y diagnóstico
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use pool_httpd::config::ServerConfig;
//! use pool_httpd::server::Server;
//! use std::num::NonZeroUsize;
//!
//! let config = ServerConfig::files("www")
//!     .port(8000)
//!     .workers(NonZeroUsize::new(4).unwrap());
//! let server = Server::bind(config).expect("bind");
//! server.run().expect("run");
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod server;
