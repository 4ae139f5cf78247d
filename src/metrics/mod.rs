//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Contadores de conexiones, workers ocupados, relays activos y latencias.

pub mod collector;

pub use collector::{ConnectionResult, MetricsCollector, MetricsSnapshot};
