//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Colaboradores HTTP/1.0 del servidor:
//!
//! - Parsing de requests (método y path)
//! - Respuestas completas y escritura incremental de respuestas
//! - Status codes y tipos MIME
//!
//! HTTP/1.0 (RFC 1945): sin conexiones persistentes ni chunked transfer
//! encoding, así que toda respuesta con body lleva `Content-Length` exacto.

pub mod mime;
pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::{Response, ResponseWriter};
pub use status::StatusCode;
