//! # Pool de Workers
//! src/server/pool.rs
//!
//! N threads fijos que consumen conexiones de la [`WorkQueue`]:
//! `pop` → handler → cerrar la conexión → repetir, durante toda la vida del
//! proceso. Un handler que falla o hace panic no mata al worker.

use super::queue::WorkQueue;
use crate::error::ServerError;
use crate::handlers::ConnectionHandler;
use crate::http::{Response, StatusCode};
use crate::metrics::{ConnectionResult, MetricsCollector};
use std::net::TcpStream;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

const PANIC_BODY: &str = "<center><h1>Server Error</h1><hr></center>";

/// Pool de workers ya iniciado
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Crea `size` workers. Falla si no se puede crear alguno.
    pub fn start<H: ConnectionHandler>(
        size: NonZeroUsize,
        queue: Arc<WorkQueue<TcpStream>>,
        handler: Arc<H>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, ServerError> {
        let mut handles = Vec::with_capacity(size.get());

        for index in 0..size.get() {
            let queue = Arc::clone(&queue);
            let handler = Arc::clone(&handler);
            let metrics = Arc::clone(&metrics);

            let handle = thread::Builder::new()
                .name(format!("worker-{}", index))
                .spawn(move || worker_loop(index, &queue, &*handler, &metrics))
                .map_err(|source| ServerError::SpawnWorker { index, source })?;
            handles.push(handle);
        }

        info!(workers = size.get(), "worker pool started");
        Ok(Self { handles })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }
}

fn worker_loop<H: ConnectionHandler>(
    index: usize,
    queue: &WorkQueue<TcpStream>,
    handler: &H,
    metrics: &MetricsCollector,
) {
    debug!(worker = index, "worker started");
    loop {
        let stream = queue.pop();
        serve_connection(stream, handler, metrics);
    }
}

/// Atiende una conexión y la cierra. Errores y panics del handler quedan
/// contenidos aquí; con un panic se intenta responder 500.
pub fn serve_connection<H: ConnectionHandler + ?Sized>(
    mut stream: TcpStream,
    handler: &H,
    metrics: &MetricsCollector,
) {
    let start = Instant::now();
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    metrics.worker_busy();

    let result = match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&mut stream))) {
        Ok(Ok(outcome)) => {
            debug!(peer = %peer, ?outcome, "connection served");
            ConnectionResult::from(outcome)
        }
        Ok(Err(e)) => {
            warn!(peer = %peer, error = %e, "connection failed");
            ConnectionResult::Failed
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(peer = %peer, panic = %message, "handler panicked");
            let _ = Response::html(StatusCode::InternalServerError, PANIC_BODY)
                .write_to(&mut stream);
            ConnectionResult::Panicked
        }
    };

    drop(stream);
    metrics.worker_idle();
    metrics.record_connection(result, start.elapsed());
}
