//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Contadores del servidor compartidos entre el listener y los workers.
//! Un relay que nunca vuelve a estar listo ocupa un worker para siempre; los
//! contadores `busy_workers` y `active_relays` hacen visible esa situación.

use crate::http::StatusCode;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Máximo de latencias a guardar para calcular percentiles
const MAX_LATENCIES: usize = 10_000;

/// Collector de métricas thread-safe
pub struct MetricsCollector {
    inner: Mutex<MetricsData>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsData {
    accepted: u64,
    handled: u64,
    failed: u64,
    panicked: u64,
    status_codes: HashMap<u16, u64>,

    /// Latencias registradas (en microsegundos)
    latencies: VecDeque<u64>,

    busy_workers: u64,
    active_relays: u64,
    relayed_to_upstream: u64,
    relayed_to_client: u64,
}

/// Resultado de atender una conexión, tal como lo ve el worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionResult {
    /// El handler respondió con este status
    Responded(StatusCode),
    /// El handler hizo relay de bytes en ambos sentidos
    Relayed { to_upstream: u64, to_client: u64 },
    /// El handler retornó un error
    Failed,
    /// El handler hizo panic
    Panicked,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsData {
                latencies: VecDeque::with_capacity(1024),
                ..MetricsData::default()
            }),
            start_time: Instant::now(),
        }
    }

    fn data(&self) -> std::sync::MutexGuard<'_, MetricsData> {
        // Los contadores siguen siendo válidos aunque otro thread haya hecho
        // panic con el lock tomado.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_accepted(&self) {
        self.data().accepted += 1;
    }

    /// Marca un worker como ocupado y retorna cuántos lo están ahora
    pub fn worker_busy(&self) -> u64 {
        let mut data = self.data();
        data.busy_workers += 1;
        data.busy_workers
    }

    pub fn worker_idle(&self) {
        let mut data = self.data();
        data.busy_workers = data.busy_workers.saturating_sub(1);
    }

    pub fn busy_workers(&self) -> u64 {
        self.data().busy_workers
    }

    pub fn relay_started(&self) {
        self.data().active_relays += 1;
    }

    pub fn relay_finished(&self) {
        let mut data = self.data();
        data.active_relays = data.active_relays.saturating_sub(1);
    }

    /// Registra el fin de una conexión
    pub fn record_connection(&self, result: ConnectionResult, latency: Duration) {
        let mut data = self.data();

        match result {
            ConnectionResult::Responded(status) => {
                data.handled += 1;
                *data.status_codes.entry(status.as_u16()).or_insert(0) += 1;
            }
            ConnectionResult::Relayed { to_upstream, to_client } => {
                data.handled += 1;
                data.relayed_to_upstream += to_upstream;
                data.relayed_to_client += to_client;
            }
            ConnectionResult::Failed => data.failed += 1,
            ConnectionResult::Panicked => data.panicked += 1,
        }

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);
    }

    /// Obtiene un snapshot de las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.data();
        let (p50, p95, p99) = percentiles(&data.latencies);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            accepted: data.accepted,
            handled: data.handled,
            failed: data.failed,
            panicked: data.panicked,
            status_codes: data.status_codes.clone(),
            busy_workers: data.busy_workers,
            active_relays: data.active_relays,
            relayed_to_upstream: data.relayed_to_upstream,
            relayed_to_client: data.relayed_to_client,
            latency_us_p50: p50,
            latency_us_p95: p95,
            latency_us_p99: p99,
        }
    }

    /// Snapshot en formato JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn percentiles(latencies: &VecDeque<u64>) -> (u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0);
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    (sorted[len * 50 / 100], sorted[len * 95 / 100], sorted[len * 99 / 100])
}

/// Snapshot de métricas
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub accepted: u64,
    pub handled: u64,
    pub failed: u64,
    pub panicked: u64,
    pub status_codes: HashMap<u16, u64>,
    pub busy_workers: u64,
    pub active_relays: u64,
    pub relayed_to_upstream: u64,
    pub relayed_to_client: u64,
    pub latency_us_p50: u64,
    pub latency_us_p95: u64,
    pub latency_us_p99: u64,
}
