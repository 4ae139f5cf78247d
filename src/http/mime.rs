//! # Tipos MIME
//! src/http/mime.rs
//!
//! Deduce el `Content-Type` a partir de la extensión del archivo.

use std::path::Path;

/// Tipo usado cuando la extensión no es conocida
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Retorna el `Content-Type` para `path` según su extensión
///
/// # Ejemplo
/// ```
/// use pool_httpd::http::mime::content_type;
/// use std::path::Path;
///
/// assert_eq!(content_type(Path::new("www/index.HTML")), "text/html");
/// assert_eq!(content_type(Path::new("README")), "text/plain");
/// ```
pub fn content_type(path: &Path) -> &'static str {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return DEFAULT_CONTENT_TYPE,
    };

    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(content_type(Path::new("a.css")), "text/css");
        assert_eq!(content_type(Path::new("dir/photo.JPEG")), "image/jpeg");
        assert_eq!(content_type(Path::new("doc.pdf")), "application/pdf");
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        assert_eq!(content_type(Path::new("archive.tar.zst")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type(Path::new(".hidden")), DEFAULT_CONTENT_TYPE);
    }
}
