//! # Configuración del Servidor
//! src/config.rs
//!
//! Argumentos CLI (con `clap`) y la configuración inmutable que se arma una
//! sola vez al arrancar y se pasa explícitamente al listener, al pool y a
//! los handlers.
//!
//! ## Ejemplos de uso
//!
//! ```bash
//! ./pool_httpd --files www/ --port 8000 --num-threads 5
//! ./pool_httpd --proxy inst.eecs.berkeley.edu:80 --port 8000 --num-threads 5
//! ```
//!
//! Sin `--num-threads` el servidor atiende cada conexión en el mismo thread
//! que hace `accept` (modo secuencial, útil para pruebas deterministas).

use crate::error::ConfigError;
use clap::{ArgGroup, Parser};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

/// Puerto por defecto del destino del proxy
pub const DEFAULT_PROXY_PORT: u16 = 80;

/// Tamaño por defecto del buffer de relay y de los bloques de archivo
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Argumentos de línea de comandos
#[derive(Debug, Clone, Parser)]
#[command(name = "pool_httpd")]
#[command(about = "Servidor HTTP/1.0 con pool de workers: archivos estáticos o proxy")]
#[command(version = "0.1.0")]
#[command(group(ArgGroup::new("service").required(true).args(["files", "proxy"])))]
pub struct Config {
    /// Directorio a servir
    #[arg(long, value_name = "DIR")]
    pub files: Option<PathBuf>,

    /// Destino del proxy (el puerto por defecto es 80)
    #[arg(long, value_name = "HOST[:PORT]")]
    pub proxy: Option<ProxyTarget>,

    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8000", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Número de workers del pool. Sin este flag no hay pool.
    #[arg(long = "num-threads", value_name = "N", env = "NUM_THREADS")]
    pub num_threads: Option<NonZeroUsize>,

    /// Tamaño en bytes del buffer de relay y de los bloques de archivo
    #[arg(long = "buffer-size", default_value_t = DEFAULT_BUFFER_SIZE, env = "BUFFER_SIZE")]
    pub buffer_size: usize,
}

impl Config {
    /// Parsea los argumentos del proceso. Ante un error imprime el uso y
    /// termina con código distinto de cero.
    pub fn new() -> Self {
        Config::parse()
    }

    /// Valida y convierte a la configuración inmutable del servidor
    pub fn into_server_config(self) -> Result<ServerConfig, ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize);
        }

        let mode = match (self.files, self.proxy) {
            (Some(root), None) => {
                if !root.is_dir() {
                    return Err(ConfigError::FilesRootNotDirectory(root));
                }
                ServiceMode::Files { root }
            }
            (None, Some(target)) => ServiceMode::Proxy(target),
            _ => return Err(ConfigError::MissingService),
        };

        Ok(ServerConfig {
            host: self.host,
            port: self.port,
            workers: self.num_threads,
            mode,
            buffer_size: self.buffer_size,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            files: None,
            proxy: None,
            port: 8000,
            host: "0.0.0.0".to_string(),
            num_threads: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Destino del proxy: `host[:port]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub host: String,
    pub port: u16,
}

impl FromStr for ProxyTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidProxyTarget(s.to_string());

        // [::1]:8080 o [::1]
        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
            match after {
                "" => (host, None),
                _ => (host, Some(after.strip_prefix(':').ok_or_else(invalid)?)),
            }
        } else {
            match s.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (s, None),
            }
        };

        if host.is_empty() {
            return Err(invalid());
        }

        let port = match port {
            Some(p) => match p.parse::<u16>() {
                Ok(0) | Err(_) => return Err(invalid()),
                Ok(port) => port,
            },
            None => DEFAULT_PROXY_PORT,
        };

        Ok(ProxyTarget {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Qué servicio atiende cada conexión. Exactamente uno por proceso.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceMode {
    Files { root: PathBuf },
    Proxy(ProxyTarget),
}

/// Configuración inmutable del servidor
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// `None` = modo secuencial sin cola
    pub workers: Option<NonZeroUsize>,

    pub mode: ServiceMode,
    pub buffer_size: usize,
}

impl ServerConfig {
    /// Configuración por defecto para servir `root`
    pub fn files(root: impl Into<PathBuf>) -> Self {
        Self::with_mode(ServiceMode::Files { root: root.into() })
    }

    /// Configuración por defecto para hacer proxy hacia `target`
    pub fn proxy(target: ProxyTarget) -> Self {
        Self::with_mode(ServiceMode::Proxy(target))
    }

    fn with_mode(mode: ServiceMode) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            workers: None,
            mode,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("=================================");
        println!("  pool_httpd HTTP/1.0 Server");
        println!("=================================");
        println!("   Address:      {}", self.address());
        match &self.mode {
            ServiceMode::Files { root } => println!("   Files root:   {}", root.display()),
            ServiceMode::Proxy(target) => println!("   Proxy target: {}", target),
        }
        match self.workers {
            Some(n) => println!("   Workers:      {}", n),
            None => println!("   Workers:      none (sequential)"),
        }
        println!("   Buffer size:  {} bytes", self.buffer_size);
        println!();
    }
}
