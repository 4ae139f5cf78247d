//! # Errores del Servidor
//! src/error.rs
//!
//! - [`ConfigError`]: configuración inválida, se detecta antes de abrir sockets.
//! - [`ServerError`]: fallas de arranque (bind, creación de workers). Son fatales.
//! - [`HandlerError`]: fallas de una conexión. Se registran y la conexión se
//!   cierra; el worker sigue atendiendo.
//! - [`RelayError`]: fallas a mitad de un relay del proxy. Terminan solo esa
//!   sesión.

use crate::http::ParseError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid proxy target '{0}': expected host[:port]")]
    InvalidProxyTarget(String),

    #[error("files root {0} is not a directory")]
    FilesRootNotDirectory(PathBuf),

    #[error("--buffer-size must be at least 1 byte")]
    InvalidBufferSize,

    #[error("either --files or --proxy must be given")]
    MissingService,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn worker {index}: {source}")]
    SpawnWorker {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("bad request: {0}")]
    Parse(#[from] ParseError),

    #[error("relay failed: {0}")]
    Relay(#[from] RelayError),

    #[error("file {path} ended after {sent} of {expected} bytes")]
    TruncatedFile {
        path: PathBuf,
        sent: u64,
        expected: u64,
    },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("poll failed: {0}")]
    Poll(#[from] nix::errno::Errno),

    #[error("read from {side} failed: {source}")]
    Read {
        side: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("write to {side} failed: {source}")]
    Write {
        side: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{side} socket reported an invalid descriptor")]
    InvalidDescriptor { side: &'static str },
}
