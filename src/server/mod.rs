//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! ```text
//!            accept                push             pop
//! clientes ─────────► Listener ─────────► WorkQueue ─────► worker-0..N-1
//!                                                              │
//!                                                    Service::handle + close
//! ```
//!
//! Sin `--num-threads` no hay pool: el thread que acepta atiende cada
//! conexión antes de aceptar la siguiente.

pub mod listener;
pub mod pool;
pub mod queue;
pub mod shutdown;

pub use listener::Listener;
pub use pool::{serve_connection, WorkerPool};
pub use queue::WorkQueue;
pub use shutdown::ShutdownHandle;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handlers::Service;
use crate::metrics::MetricsCollector;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Servidor ya enlazado a su dirección, listo para `run`
pub struct Server {
    config: ServerConfig,
    listener: Listener,
    service: Arc<Service>,
    metrics: Arc<MetricsCollector>,
}

impl Server {
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = Listener::bind(&config.address())?;
        let metrics = Arc::new(MetricsCollector::new());
        let service = Arc::new(Service::from_config(&config, Arc::clone(&metrics)));

        Ok(Self {
            config,
            listener,
            service,
            metrics,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.listener.shutdown_handle()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics)
    }

    /// Acepta conexiones hasta el shutdown. Los workers no se esperan: las
    /// conexiones en curso terminan cuando termina el proceso.
    pub fn run(self) -> Result<(), ServerError> {
        info!(
            addr = %self.local_addr(),
            service = self.service.name(),
            workers = self.config.workers.map_or(0, |n| n.get()),
            "listening"
        );

        match self.config.workers {
            Some(size) => {
                let queue = Arc::new(WorkQueue::new());
                let pool = WorkerPool::start(
                    size,
                    Arc::clone(&queue),
                    Arc::clone(&self.service),
                    Arc::clone(&self.metrics),
                )?;
                self.listener.accept_loop(|stream, peer| {
                    self.dispatch(&queue, pool.size(), stream, peer)
                });
            }
            None => {
                self.listener.accept_loop(|stream, peer| {
                    debug!(peer = %peer, "connection accepted");
                    self.metrics.record_accepted();
                    serve_connection(stream, &*self.service, &self.metrics);
                });
            }
        }

        info!("listener closed");
        Ok(())
    }

    fn dispatch(
        &self,
        queue: &WorkQueue<TcpStream>,
        pool_size: usize,
        stream: TcpStream,
        peer: SocketAddr,
    ) {
        debug!(peer = %peer, "connection accepted");
        self.metrics.record_accepted();
        queue.push(stream);

        let busy = self.metrics.busy_workers() as usize;
        let queued = queue.len();
        if pool_saturated(busy, pool_size, queued) {
            warn!(
                busy_workers = busy,
                queued,
                "all workers busy, connections waiting"
            );
        }
    }
}

/// Todos los workers ocupados y al menos una conexión esperando en la cola
fn pool_saturated(busy: usize, pool_size: usize, queued: usize) -> bool {
    queued > 0 && busy >= pool_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_saturation() {
        // Una sola conexión esperando ya es saturación
        assert!(pool_saturated(2, 2, 1));
        assert!(pool_saturated(3, 2, 5));

        assert!(!pool_saturated(2, 2, 0));
        assert!(!pool_saturated(1, 2, 1));
    }
}
