//! Lightweight in-process metrics (no metrics crate).
//!
//! Request and fault counters plus pipeline latency, stored as atomics and
//! rendered by the `/metrics` handler.

pub mod metrics;

pub use metrics::AdapterMetrics;
