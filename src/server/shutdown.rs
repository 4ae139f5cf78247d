//! # Apagado del Listener
//! src/server/shutdown.rs
//!
//! `accept` bloquea sin timeout, así que para salir del loop no alcanza con
//! levantar la bandera: además hay que abrir una conexión propia que
//! despierte al listener.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Handle clonable para detener el accept loop desde otro thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    pub(crate) fn new(flag: Arc<AtomicBool>, local_addr: SocketAddr) -> Self {
        Self {
            flag,
            wake_addr: wake_address(local_addr),
        }
    }

    /// Pide al listener que deje de aceptar. Llamadas repetidas no hacen nada.
    pub fn trigger(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("shutdown requested");

        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT) {
            debug!(addr = %self.wake_addr, error = %e, "wake-up connection failed");
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Una dirección "cualquiera" no se puede usar para conectar; se usa loopback
fn wake_address(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_wake_address_uses_loopback_for_unspecified() {
        let addr: SocketAddr = "0.0.0.0:8000".parse().unwrap();
        assert_eq!(wake_address(addr), "127.0.0.1:8000".parse().unwrap());

        let addr: SocketAddr = "[::]:8000".parse().unwrap();
        assert_eq!(wake_address(addr), "[::1]:8000".parse().unwrap());

        let addr: SocketAddr = "10.0.0.5:80".parse().unwrap();
        assert_eq!(wake_address(addr), addr);
    }

    #[test]
    fn test_trigger_sets_flag_and_connects_once() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let handle = ShutdownHandle::new(
            Arc::new(AtomicBool::new(false)),
            listener.local_addr().unwrap(),
        );
        assert!(!handle.is_triggered());

        handle.trigger();
        handle.clone().trigger();
        assert!(handle.is_triggered());

        // Exactamente una conexión de despertar
        listener.set_nonblocking(true).unwrap();
        assert!(listener.accept().is_ok());
        assert!(listener.accept().is_err());
    }
}
