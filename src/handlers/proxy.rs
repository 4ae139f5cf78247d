//! # Proxy TCP
//! src/handlers/proxy.rs
//!
//! ```text
//!   +--------+     +------------+     +--------------+
//!   | client | <-> | pool_httpd | <-> | proxy target |
//!   +--------+     +------------+     +--------------+
//! ```
//!
//! Por cada conexión se abre una conexión nueva al destino y se hace relay
//! en ambos sentidos desde el primer byte. Si el destino no resuelve o no
//! acepta, se consume el request del cliente y se responde 502.

use super::relay::relay;
use super::Outcome;
use crate::config::ProxyTarget;
use crate::error::HandlerError;
use crate::http::{Request, Response, StatusCode};
use crate::metrics::MetricsCollector;
use std::io;
use std::net::TcpStream;
use std::sync::Arc;
use tracing::{debug, warn};

const BAD_GATEWAY_BODY: &str = "<center><h1>502 Bad Gateway</h1><hr></center>";

/// Handler que reenvía cada conexión al destino configurado
pub struct ProxyHandler {
    target: ProxyTarget,
    buffer_size: usize,
    metrics: Arc<MetricsCollector>,
}

impl ProxyHandler {
    pub fn new(target: ProxyTarget, buffer_size: usize, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            target,
            buffer_size,
            metrics,
        }
    }

    pub fn serve(&self, client: &mut TcpStream) -> Result<Outcome, HandlerError> {
        let upstream = match self.connect_upstream() {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(target = %self.target, error = %e, "upstream unreachable");
                return self.reject(client);
            }
        };

        debug!(target = %self.target, "relay started");
        self.metrics.relay_started();
        let result = relay(client, &upstream, self.buffer_size);
        self.metrics.relay_finished();

        let outcome = result?;
        debug!(
            target = %self.target,
            to_upstream = outcome.to_upstream,
            to_client = outcome.to_client,
            closed_by = outcome.closed_by.as_str(),
            "relay finished"
        );
        Ok(Outcome::Relayed(outcome))
    }

    /// Resuelve el destino y prueba cada dirección en orden
    fn connect_upstream(&self) -> io::Result<TcpStream> {
        TcpStream::connect((self.target.host.as_str(), self.target.port))
    }

    /// Consume el request del cliente y responde 502
    fn reject(&self, client: &mut TcpStream) -> Result<Outcome, HandlerError> {
        if let Err(e) = Request::read_from(client) {
            debug!(error = %e, "discarded unparseable request");
        }
        Response::html(StatusCode::BadGateway, BAD_GATEWAY_BODY).write_to(client)?;
        Ok(Outcome::Responded(StatusCode::BadGateway))
    }
}
