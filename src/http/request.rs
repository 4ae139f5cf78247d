//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Parser HTTP/1.0 mínimo. El servidor usa el método (GET o HEAD) y el path;
//! de los headers solo se loguea `Host`. La query string se descarta.
//!
//! ## Formato de un Request HTTP/1.0
//!
//! ```text
//! GET /docs/index.html HTTP/1.0\r\n
//! Host: localhost:8000\r\n
//! User-Agent: curl/7.68.0\r\n
//! \r\n
//! ```

use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use thiserror::Error;

/// Tamaño máximo de la cabecera de un request (request line + headers)
pub const MAX_HEADER_BYTES: usize = 8192;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// HEAD - Como GET pero solo retorna headers
    HEAD,
}

impl Method {
    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
        }
    }
}

/// Representa un request HTTP/1.0 parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path ya decodificado (sin query string)
    path: String,

    headers: HashMap<String, String>,
}

/// Errores que pueden ocurrir al leer o parsear un request
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Empty request")]
    EmptyRequest,

    #[error("Request headers exceed {} bytes", MAX_HEADER_BYTES)]
    HeadersTooLarge,

    #[error("I/O error while reading request: {0}")]
    Io(#[from] std::io::Error),
}

impl Request {
    /// Lee un request desde un stream hasta la línea vacía, EOF o el límite
    /// de [`MAX_HEADER_BYTES`], y lo parsea.
    ///
    /// Cualquier body que venga después de la línea vacía queda sin leer.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, ParseError> {
        let mut buffer = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);

            if let Some(end) = find_header_end(&buffer) {
                buffer.truncate(end);
                break;
            }
            if buffer.len() > MAX_HEADER_BYTES {
                return Err(ParseError::HeadersTooLarge);
            }
        }

        Self::parse(&buffer)
    }

    /// Parsea un request HTTP/1.0 desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use pool_httpd::http::Request;
    ///
    /// let raw = b"GET /docs/a%20b.txt?x=1 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/docs/a b.txt");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let request_str =
            std::str::from_utf8(buffer).map_err(|_| ParseError::InvalidRequestLine)?;

        if request_str.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let lines: Vec<&str> = request_str.split("\r\n").collect();

        let (method, path) = Self::parse_request_line(lines[0])?;
        let headers = Self::parse_headers(&lines[1..])?;

        Ok(Request {
            method,
            path,
            headers,
        })
    }

    /// Formato: `GET /path?query HTTP/1.0`
    fn parse_request_line(line: &str) -> Result<(Method, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::from_str(parts[0])?;

        let raw_path = parts[1].split_once('?').map_or(parts[1], |(path, _)| path);
        if !raw_path.starts_with('/') {
            return Err(ParseError::InvalidRequestLine);
        }
        let path = percent_decode(raw_path).ok_or(ParseError::InvalidRequestLine)?;

        let version = parts[2];
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version.to_string()));
        }

        Ok((method, path))
    }

    /// Cada header tiene formato: "Name: Value"
    fn parse_headers(lines: &[&str]) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }

            match line.split_once(':') {
                Some((name, value)) => {
                    headers.insert(name.trim().to_string(), value.trim().to_string());
                }
                None => return Err(ParseError::InvalidHeader(line.to_string())),
            }
        }

        Ok(headers)
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }
}

/// Posición justo después de `\r\n\r\n`, si ya llegó
fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Decodifica secuencias `%XX`. Retorna `None` si una secuencia está
/// truncada, no es hexadecimal o el resultado no es UTF-8.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_simple_get() {
        let raw = b"GET / HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/");
    }

    #[test]
    fn test_query_string_is_dropped() {
        let raw = b"HEAD /index.html?num=10 HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), Method::HEAD);
        assert_eq!(request.path(), "/index.html");
    }

    #[test]
    fn test_parse_with_headers() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost:8000\r\nUser-Agent: test\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.header("Host"), Some("localhost:8000"));
        assert_eq!(request.header("User-Agent"), Some("test"));
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let raw = b"GET /my%20file.txt HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.path(), "/my file.txt");
    }

    #[test]
    fn test_bad_percent_sequence() {
        let raw = b"GET /bad%zz HTTP/1.0\r\n\r\n";
        assert!(matches!(Request::parse(raw), Err(ParseError::InvalidRequestLine)));
    }

    #[test]
    fn test_relative_path_rejected() {
        let raw = b"GET index.html HTTP/1.0\r\n\r\n";
        assert!(matches!(Request::parse(raw), Err(ParseError::InvalidRequestLine)));
    }

    #[test]
    fn test_invalid_version() {
        let raw = b"GET / HTTP/2.0\r\n\r\n";
        assert!(matches!(Request::parse(raw), Err(ParseError::InvalidHttpVersion(_))));
    }

    #[test]
    fn test_unsupported_method() {
        let raw = b"BREW /pot HTTP/1.0\r\n\r\n";
        assert!(matches!(Request::parse(raw), Err(ParseError::UnsupportedMethod(_))));
        let raw = b"POST /form HTTP/1.0\r\n\r\n";
        assert!(matches!(Request::parse(raw), Err(ParseError::UnsupportedMethod(_))));
    }

    #[test]
    fn test_empty_request() {
        assert!(matches!(Request::parse(b""), Err(ParseError::EmptyRequest)));
    }

    #[test]
    fn test_read_from_stops_at_blank_line() {
        let mut reader = Cursor::new(b"GET /a HTTP/1.0\r\nHost: x\r\n\r\nbody-bytes".to_vec());
        let request = Request::read_from(&mut reader).unwrap();

        assert_eq!(request.path(), "/a");
        assert_eq!(request.header("Host"), Some("x"));
    }

    #[test]
    fn test_read_from_accepts_eof_without_blank_line() {
        let mut reader = Cursor::new(b"GET /a HTTP/1.0\r\n".to_vec());
        let request = Request::read_from(&mut reader).unwrap();

        assert_eq!(request.path(), "/a");
    }

    #[test]
    fn test_read_from_empty_stream() {
        let mut reader = Cursor::new(Vec::new());
        assert!(matches!(Request::read_from(&mut reader), Err(ParseError::EmptyRequest)));
    }

    #[test]
    fn test_read_from_rejects_huge_headers() {
        let mut raw = b"GET / HTTP/1.0\r\n".to_vec();
        raw.extend(std::iter::repeat(b'a').take(MAX_HEADER_BYTES + 10));
        let mut reader = Cursor::new(raw);

        assert!(matches!(Request::read_from(&mut reader), Err(ParseError::HeadersTooLarge)));
    }
}
