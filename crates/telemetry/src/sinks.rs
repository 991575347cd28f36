// Path: crates/telemetry/src/sinks.rs
//! Defines the abstract trait for chain metrics, decoupling the pipeline from
//! the metrics backend.
//!
//! A sink is handed to each chain at construction; there is no global sink.

/// A sink for metrics related to one chain's request pipeline.
pub trait ChainMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of processed requests, labeled by outcome
    /// (`success` or an error code).
    fn inc_requests_processed(&self, outcome: &str);
    /// Increments the counter of committed blocks.
    fn inc_blocks_committed(&self);
    /// Increments the counter of batches whose anchoring failed.
    fn inc_anchor_failures(&self);
    /// Observes the wall time spent executing and anchoring one batch.
    fn observe_batch_duration(&self, duration_secs: f64);
    /// Sets the gauge for the number of requests waiting in the backlog.
    fn set_backlog_len(&self, len: usize);
}

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopSink;

impl ChainMetricsSink for NopSink {
    fn inc_requests_processed(&self, _outcome: &str) {}
    fn inc_blocks_committed(&self) {}
    fn inc_anchor_failures(&self) {}
    fn observe_batch_duration(&self, _duration_secs: f64) {}
    fn set_backlog_len(&self, _len: usize) {}
}
