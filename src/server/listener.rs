//! # Listener TCP
//! src/server/listener.rs
//!
//! Socket de escucha más su accept loop. Los errores de `accept` se loguean
//! y el loop sigue; solo el [`ShutdownHandle`] lo termina.

use super::shutdown::ShutdownHandle;
use crate::error::ServerError;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
}

impl Listener {
    pub fn bind(addr: &str) -> Result<Self, ServerError> {
        let bind_error = |source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        };
        let inner = TcpListener::bind(addr).map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;
        let shutdown = ShutdownHandle::new(Arc::new(AtomicBool::new(false)), local_addr);

        Ok(Self {
            inner,
            local_addr,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Acepta conexiones hasta que se dispare el shutdown. La conexión que
    /// despierta al loop se descarta sin pasarla a `on_accept`.
    pub fn accept_loop<F>(&self, mut on_accept: F)
    where
        F: FnMut(TcpStream, SocketAddr),
    {
        loop {
            match self.inner.accept() {
                Ok((stream, peer)) => {
                    if self.shutdown.is_triggered() {
                        debug!(peer = %peer, "listener woken for shutdown");
                        break;
                    }
                    on_accept(stream, peer);
                }
                Err(e) => {
                    if self.shutdown.is_triggered() {
                        break;
                    }
                    warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
