//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Dos formas de responder:
//!
//! - [`Response`]: respuesta completa en memoria (errores, listados de
//!   directorio). Calcula `Content-Length` automáticamente.
//! - [`ResponseWriter`]: escritura incremental sobre el socket (status line,
//!   headers y luego el body por bloques). Se usa para servir archivos sin
//!   cargarlos completos en memoria.
//!
//! ## Formato de una respuesta HTTP/1.0
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 13\r\n
//! \r\n
//! <h1>hola</h1>
//! ```

use super::StatusCode;
use std::collections::HashMap;
use std::io::{self, Write};

/// Representa una respuesta HTTP/1.0 completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Usamos HashMap para evitar duplicados
    headers: HashMap<String, String>,

    body: Vec<u8>,
}

impl Response {
    /// Crea una nueva respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header a la respuesta. Si ya existe, se sobrescribe.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Establece el cuerpo y agrega el header `Content-Length`
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self
    }

    /// Respuesta HTML con `Content-Type: text/html`
    ///
    /// # Ejemplo
    /// ```
    /// use pool_httpd::http::{Response, StatusCode};
    ///
    /// let response = Response::html(StatusCode::NotFound, "<h1>404</h1>");
    /// assert_eq!(response.headers().get("Content-Type").unwrap(), "text/html");
    /// ```
    pub fn html(status: StatusCode, body: &str) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/html")
            .with_body(body)
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = self.head_bytes();
        result.extend_from_slice(&self.body);
        result
    }

    /// Status line y headers, terminados en la línea vacía
    fn head_bytes(&self) -> Vec<u8> {
        let mut result = format!("HTTP/1.0 {}\r\n", self.status).into_bytes();

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result
    }

    /// Escribe la respuesta completa en `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()
    }

    /// Respuesta a un `HEAD`: los mismos headers (incluido `Content-Length`)
    /// sin el body
    pub fn write_head_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.head_bytes())?;
        writer.flush()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

/// Etapa en la que se encuentra un [`ResponseWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Headers,
    Body,
}

/// Escritor incremental de respuestas HTTP/1.0
///
/// Los headers se acumulan en memoria y se envían juntos en
/// [`end_headers`](Self::end_headers); el body se escribe directo al
/// stream con `write_all`, así que una escritura corta nunca pierde datos.
pub struct ResponseWriter<W: Write> {
    inner: W,
    head: Vec<u8>,
    stage: Stage,
    body_bytes: u64,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            head: Vec::with_capacity(256),
            stage: Stage::Idle,
            body_bytes: 0,
        }
    }

    /// Escribe la status line (`HTTP/1.0 200 OK`)
    pub fn start(&mut self, status: StatusCode) -> io::Result<()> {
        self.expect_stage(Stage::Idle)?;
        self.head
            .extend_from_slice(format!("HTTP/1.0 {}\r\n", status).as_bytes());
        self.stage = Stage::Headers;
        Ok(())
    }

    pub fn header(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.expect_stage(Stage::Headers)?;
        self.head
            .extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        Ok(())
    }

    /// Cierra la sección de headers y la envía
    pub fn end_headers(&mut self) -> io::Result<()> {
        self.expect_stage(Stage::Headers)?;
        self.head.extend_from_slice(b"\r\n");
        self.inner.write_all(&self.head)?;
        self.head.clear();
        self.stage = Stage::Body;
        Ok(())
    }

    pub fn send_data(&mut self, data: &[u8]) -> io::Result<()> {
        self.expect_stage(Stage::Body)?;
        self.inner.write_all(data)?;
        self.body_bytes += data.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Bytes de body enviados hasta ahora
    pub fn body_bytes(&self) -> u64 {
        self.body_bytes
    }

    fn expect_stage(&self, stage: Stage) -> io::Result<()> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("response writer in stage {:?}, expected {:?}", self.stage, stage),
            ))
        }
    }
}
