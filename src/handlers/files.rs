//! # Servidor de Archivos
//! src/handlers/files.rs
//!
//! Resuelve el path del request debajo del directorio servido:
//!
//! | Estado del path                     | Respuesta                         |
//! |-------------------------------------|-----------------------------------|
//! | no existe / fuera del root          | 404                               |
//! | directorio con `index.html`         | 200 con el index                  |
//! | directorio sin `index.html`         | 200 con listado de entradas       |
//! | archivo regular                     | 200, `Content-Length` exacto      |
//! | error de stat/open (no NotFound)    | 500                               |
//!
//! "Fuera del root" se decide sobre el path real: un symlink (también un
//! `index.html`) que apunta afuera del directorio servido se responde 404.
//! Un `HEAD` recibe los mismos headers que el `GET` equivalente, sin body.

use super::Outcome;
use crate::error::HandlerError;
use crate::http::{mime, Method, Request, Response, ResponseWriter, StatusCode};
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Archivo que se sirve en lugar del listado de un directorio
pub const INDEX_FILE: &str = "index.html";

const NOT_FOUND_BODY: &str = "<center><h1>404 Not Found</h1><hr></center>";
const SERVER_ERROR_BODY: &str = "<center><h1>Server Error</h1><hr></center>";

/// Handler que sirve archivos estáticos desde `root`
pub struct FileHandler {
    root: PathBuf,
    chunk_size: usize,
}

/// Destino de una respuesta; con `HEAD` se omite el body
struct Reply<'a, W: Write> {
    out: &'a mut W,
    head_only: bool,
}

impl<W: Write> Reply<'_, W> {
    fn send(&mut self, response: Response) -> io::Result<()> {
        if self.head_only {
            response.write_head_to(self.out)
        } else {
            response.write_to(self.out)
        }
    }

    fn not_found(&mut self) -> Result<StatusCode, HandlerError> {
        self.send(Response::html(StatusCode::NotFound, NOT_FOUND_BODY))?;
        Ok(StatusCode::NotFound)
    }

    fn server_error(&mut self) -> Result<StatusCode, HandlerError> {
        self.send(Response::html(StatusCode::InternalServerError, SERVER_ERROR_BODY))?;
        Ok(StatusCode::InternalServerError)
    }
}

impl FileHandler {
    /// `chunk_size` es el tamaño de los bloques con que se envían los archivos
    pub fn new(root: PathBuf, chunk_size: usize) -> Self {
        // Con el root canónico se pueden detectar symlinks que salen de él
        let root = root.canonicalize().unwrap_or(root);
        Self {
            root,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lee un request de `stream` y escribe la respuesta
    pub fn serve<S: Read + Write>(&self, stream: &mut S) -> Result<Outcome, HandlerError> {
        let request = match Request::read_from(stream) {
            Ok(request) => request,
            Err(e) => {
                let _ = Response::html(StatusCode::InternalServerError, SERVER_ERROR_BODY)
                    .write_to(stream);
                return Err(e.into());
            }
        };

        debug!(
            method = request.method().as_str(),
            path = request.path(),
            host = request.header("Host").unwrap_or("-"),
            "file request"
        );
        let status = self.respond(request.method(), request.path(), stream)?;
        Ok(Outcome::Responded(status))
    }

    /// Escribe en `out` la respuesta para `request_path`
    pub fn respond<W: Write>(
        &self,
        method: Method,
        request_path: &str,
        out: &mut W,
    ) -> Result<StatusCode, HandlerError> {
        let mut reply = Reply {
            out,
            head_only: method == Method::HEAD,
        };

        let path = match self.resolve(request_path) {
            Some(path) => path,
            None => {
                debug!(path = request_path, "path escapes served root");
                return reply.not_found();
            }
        };

        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return reply.not_found(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat path");
                return reply.server_error();
            }
        };

        match self.within_root(&path) {
            Ok(true) => {}
            Ok(false) => return reply.not_found(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot resolve path");
                return reply.server_error();
            }
        }

        if meta.is_dir() {
            let index = path.join(INDEX_FILE);
            match fs::metadata(&index) {
                Ok(index_meta) if index_meta.is_file() => match self.within_root(&index) {
                    Ok(true) => self.send_file(&index, &mut reply),
                    Ok(false) => reply.not_found(),
                    Err(e) => {
                        warn!(path = %index.display(), error = %e, "cannot resolve index");
                        reply.server_error()
                    }
                },
                Ok(_) => self.send_listing(&path, request_path, &mut reply),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    self.send_listing(&path, request_path, &mut reply)
                }
                Err(e) => {
                    warn!(path = %index.display(), error = %e, "cannot stat index");
                    reply.server_error()
                }
            }
        } else if meta.is_file() {
            self.send_file(&path, &mut reply)
        } else {
            // sockets, fifos, dispositivos
            reply.not_found()
        }
    }

    /// Traduce el path del request a un path debajo de `root`.
    /// Retorna `None` si algún segmento es `..`.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();

        for segment in request_path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return None,
                _ => {}
            }
            // Un segmento nunca puede ser absoluto ni un prefijo de Windows
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => resolved.push(part),
                _ => return None,
            }
        }

        Some(resolved)
    }

    /// Sigue los symlinks de `path` y verifica que el destino quede bajo `root`
    fn within_root(&self, path: &Path) -> io::Result<bool> {
        let real = fs::canonicalize(path)?;
        if real.starts_with(&self.root) {
            Ok(true)
        } else {
            debug!(path = %real.display(), "symlink escapes served root");
            Ok(false)
        }
    }

    fn send_file<W: Write>(
        &self,
        path: &Path,
        reply: &mut Reply<'_, W>,
    ) -> Result<StatusCode, HandlerError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open file");
                return reply.server_error();
            }
        };
        let expected = match file.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat open file");
                return reply.server_error();
            }
        };

        let mut writer = ResponseWriter::new(&mut *reply.out);
        writer.start(StatusCode::Ok)?;
        writer.header("Content-Type", mime::content_type(path))?;
        writer.header("Content-Length", &expected.to_string())?;
        writer.end_headers()?;

        if reply.head_only {
            writer.flush()?;
            return Ok(StatusCode::Ok);
        }

        // take: si el archivo crece mientras se envía, no se manda de más
        let mut reader = file.take(expected);
        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            writer.send_data(&buffer[..n])?;
        }

        let sent = writer.body_bytes();
        if sent != expected {
            return Err(HandlerError::TruncatedFile {
                path: path.to_path_buf(),
                sent,
                expected,
            });
        }

        writer.flush()?;
        debug!(path = %path.display(), bytes = sent, "file sent");
        Ok(StatusCode::Ok)
    }

    fn send_listing<W: Write>(
        &self,
        dir: &Path,
        request_path: &str,
        reply: &mut Reply<'_, W>,
    ) -> Result<StatusCode, HandlerError> {
        let entries = match list_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "cannot read directory");
                return reply.server_error();
            }
        };

        let base = if request_path.ends_with('/') {
            request_path.to_string()
        } else {
            format!("{}/", request_path)
        };

        let mut body = String::from("<center><h1>Directory Listing</h1><hr></center>\n");
        body.push_str(&format!("<h2>contents of {}</h2>\n", escape_html(&base)));
        if base != "/" {
            body.push_str(&format!(
                "<h3><a href=\"{}../\">../</a></h3>\n",
                encode_href(&base)
            ));
        }
        for name in &entries {
            body.push_str(&format!(
                "<h3><a href=\"{}{}\">{}</a></h3>\n",
                encode_href(&base),
                encode_href(name),
                escape_html(name)
            ));
        }

        reply.send(Response::html(StatusCode::Ok, &body))?;
        Ok(StatusCode::Ok)
    }
}

/// Nombres de las entradas directas, ordenados; los directorios con `/` final
fn list_dir(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encoding para hrefs; conserva `/`
fn encode_href(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Stream en memoria: lee de `input`, escribe en `output`
    struct MockStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl MockStream {
        fn get(path: &str) -> Self {
            Self::request("GET", path)
        }

        fn request(method: &str, path: &str) -> Self {
            let raw = format!("{} {} HTTP/1.0\r\n\r\n", method, path);
            Self {
                input: Cursor::new(raw.into_bytes()),
                output: Vec::new(),
            }
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// (status line, headers, body)
    fn split_response(raw: &[u8]) -> (String, String, Vec<u8>) {
        let end = raw.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        let head = String::from_utf8(raw[..end].to_vec()).unwrap();
        let (status, headers) = head.split_once("\r\n").unwrap_or((&head, ""));
        (status.to_string(), headers.to_string(), raw[end + 4..].to_vec())
    }

    fn get(handler: &FileHandler, path: &str) -> (String, String, Vec<u8>) {
        let mut stream = MockStream::get(path);
        handler.serve(&mut stream).unwrap();
        split_response(&stream.output)
    }

    fn fixture() -> (tempfile::TempDir, FileHandler) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.txt"), b"hello world\n").unwrap();
        fs::create_dir(dir.path().join("site")).unwrap();
        fs::write(dir.path().join("site").join("index.html"), b"<h1>site</h1>").unwrap();
        fs::create_dir(dir.path().join("pub")).unwrap();
        fs::write(dir.path().join("pub").join("a.css"), b"body{}").unwrap();
        fs::write(dir.path().join("pub").join("b <x>.png"), [0x89, 0x50]).unwrap();
        fs::create_dir(dir.path().join("pub").join("nested")).unwrap();
        let handler = FileHandler::new(dir.path().to_path_buf(), 4);
        (dir, handler)
    }

    #[test]
    fn test_regular_file() {
        let (_dir, handler) = fixture();
        let (status, headers, body) = get(&handler, "/hello.txt");

        assert_eq!(status, "HTTP/1.0 200 OK");
        assert!(headers.contains("Content-Type: text/plain"));
        assert!(headers.contains("Content-Length: 12"));
        assert_eq!(body, b"hello world\n");
    }

    #[test]
    fn test_directory_with_index() {
        let (_dir, handler) = fixture();
        let (status, headers, body) = get(&handler, "/site/");

        assert_eq!(status, "HTTP/1.0 200 OK");
        assert!(headers.contains("Content-Type: text/html"));
        assert_eq!(body, b"<h1>site</h1>");
    }

    #[test]
    fn test_directory_listing() {
        let (_dir, handler) = fixture();
        let (status, headers, body) = get(&handler, "/pub");
        let body = String::from_utf8(body).unwrap();

        assert_eq!(status, "HTTP/1.0 200 OK");
        assert!(headers.contains("Content-Type: text/html"));
        assert!(body.contains("href=\"/pub/a.css\""));
        assert!(body.contains("href=\"/pub/nested/\""));
        assert!(body.contains("href=\"/pub/b%20%3Cx%3E.png\""));
        assert!(body.contains("b &lt;x&gt;.png"));
        assert!(body.contains("href=\"/pub/../\""));
    }

    #[test]
    fn test_missing_path() {
        let (_dir, handler) = fixture();
        let (status, _, body) = get(&handler, "/nope.html");

        assert_eq!(status, "HTTP/1.0 404 Not Found");
        assert_eq!(body, NOT_FOUND_BODY.as_bytes());
    }

    #[test]
    fn test_traversal_is_rejected() {
        let (_dir, handler) = fixture();

        assert!(handler.resolve("/../secret.txt").is_none());
        assert!(handler.resolve("/pub/../../etc/passwd").is_none());

        let (status, _, _) = get(&handler, "/pub/../../etc/passwd");
        assert_eq!(status, "HTTP/1.0 404 Not Found");
    }

    #[test]
    fn test_resolve_stays_under_root() {
        let (_dir, handler) = fixture();
        let resolved = handler.resolve("//pub/./a.css").unwrap();

        assert_eq!(resolved, handler.root().join("pub").join("a.css"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_root_is_not_served() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), b"top secret").unwrap();
        let (dir, handler) = fixture();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();

        let (status, _, _) = get(&handler, "/escape/secret.txt");
        assert_eq!(status, "HTTP/1.0 404 Not Found");
    }

    #[cfg(unix)]
    #[test]
    fn test_index_symlink_out_of_root_is_not_served() {
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.txt");
        fs::write(&secret, b"top secret").unwrap();
        let (dir, handler) = fixture();
        fs::create_dir(dir.path().join("trap")).unwrap();
        std::os::unix::fs::symlink(&secret, dir.path().join("trap").join(INDEX_FILE)).unwrap();

        let (status, _, _) = get(&handler, "/trap/index.html");
        assert_eq!(status, "HTTP/1.0 404 Not Found");

        let (status, _, body) = get(&handler, "/trap/");
        assert_eq!(status, "HTTP/1.0 404 Not Found");
        assert_eq!(body, NOT_FOUND_BODY.as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn test_index_symlink_inside_root_is_served() {
        let (dir, handler) = fixture();
        fs::create_dir(dir.path().join("alias")).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("hello.txt"),
            dir.path().join("alias").join(INDEX_FILE),
        )
        .unwrap();

        let (status, _, body) = get(&handler, "/alias/");
        assert_eq!(status, "HTTP/1.0 200 OK");
        assert_eq!(body, b"hello world\n");
    }

    #[test]
    fn test_head_sends_headers_only() {
        let (_dir, handler) = fixture();

        let mut stream = MockStream::request("HEAD", "/hello.txt");
        let outcome = handler.serve(&mut stream).unwrap();
        assert_eq!(outcome, Outcome::Responded(StatusCode::Ok));
        let (status, headers, body) = split_response(&stream.output);
        assert_eq!(status, "HTTP/1.0 200 OK");
        assert!(headers.contains("Content-Length: 12"));
        assert!(body.is_empty());

        let mut stream = MockStream::request("HEAD", "/nope.html");
        handler.serve(&mut stream).unwrap();
        let (status, headers, body) = split_response(&stream.output);
        assert_eq!(status, "HTTP/1.0 404 Not Found");
        assert!(headers.contains(&format!("Content-Length: {}", NOT_FOUND_BODY.len())));
        assert!(body.is_empty());
    }

    #[test]
    fn test_unparseable_request_gets_500() {
        let (_dir, handler) = fixture();
        let mut stream = MockStream {
            input: Cursor::new(b"\x00\x01garbage\r\n\r\n".to_vec()),
            output: Vec::new(),
        };

        assert!(matches!(handler.serve(&mut stream), Err(HandlerError::Parse(_))));
        let (status, _, _) = split_response(&stream.output);
        assert_eq!(status, "HTTP/1.0 500 Internal Server Error");
    }

    #[test]
    fn test_href_encoding() {
        assert_eq!(encode_href("/a b/ü"), "/a%20b/%C3%BC");
        assert_eq!(escape_html("<a & 'b'>"), "&lt;a &amp; &#39;b&#39;&gt;");
    }
}
