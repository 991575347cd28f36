// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sink using the Prometheus crate.

use crate::sinks::ChainMetricsSink;
use prometheus::{
    exponential_buckets, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry,
};

/// A [`ChainMetricsSink`] backed by Prometheus collectors.
///
/// The collectors are registered in the registry passed to [`install`]
/// and carry a constant `chain` label, so several chains can share one
/// registry.
///
/// [`install`]: PrometheusSink::install
#[derive(Debug, Clone)]
pub struct PrometheusSink {
    requests_processed_total: IntCounterVec,
    blocks_committed_total: IntCounter,
    anchor_failures_total: IntCounter,
    batch_duration_seconds: Histogram,
    backlog_len: IntGauge,
}

impl PrometheusSink {
    /// Creates the collectors for `chain` and registers them in `registry`.
    pub fn install(registry: &Registry, chain: &str) -> Result<Self, prometheus::Error> {
        let labeled = |name: &str, help: &str| Opts::new(name, help).const_label("chain", chain);

        let requests_processed_total = IntCounterVec::new(
            labeled(
                "chroma_requests_processed_total",
                "Total number of requests executed, by outcome.",
            ),
            &["outcome"],
        )?;
        let blocks_committed_total = IntCounter::with_opts(labeled(
            "chroma_blocks_committed_total",
            "Total number of blocks committed to the virtual state.",
        ))?;
        let anchor_failures_total = IntCounter::with_opts(labeled(
            "chroma_anchor_failures_total",
            "Total number of batches whose anchoring transaction failed.",
        ))?;
        let batch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "chroma_batch_duration_seconds",
                "Time spent executing and anchoring one batch.",
            )
            .const_label("chain", chain)
            .buckets(exponential_buckets(0.0005, 2.0, 16)?),
        )?;
        let backlog_len = IntGauge::with_opts(labeled(
            "chroma_backlog_len",
            "Number of requests waiting in the backlog.",
        ))?;

        registry.register(Box::new(requests_processed_total.clone()))?;
        registry.register(Box::new(blocks_committed_total.clone()))?;
        registry.register(Box::new(anchor_failures_total.clone()))?;
        registry.register(Box::new(batch_duration_seconds.clone()))?;
        registry.register(Box::new(backlog_len.clone()))?;

        Ok(Self {
            requests_processed_total,
            blocks_committed_total,
            anchor_failures_total,
            batch_duration_seconds,
            backlog_len,
        })
    }
}

impl ChainMetricsSink for PrometheusSink {
    fn inc_requests_processed(&self, outcome: &str) {
        self.requests_processed_total
            .with_label_values(&[outcome])
            .inc();
    }
    fn inc_blocks_committed(&self) {
        self.blocks_committed_total.inc();
    }
    fn inc_anchor_failures(&self) {
        self.anchor_failures_total.inc();
    }
    fn observe_batch_duration(&self, duration_secs: f64) {
        self.batch_duration_seconds.observe(duration_secs);
    }
    fn set_backlog_len(&self, len: usize) {
        self.backlog_len
            .set(i64::try_from(len).unwrap_or(i64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collectors_are_registered_per_chain() {
        let registry = Registry::new();
        let a = PrometheusSink::install(&registry, "a").unwrap();
        let b = PrometheusSink::install(&registry, "b").unwrap();
        a.inc_requests_processed("success");
        a.inc_requests_processed("success");
        b.inc_blocks_committed();
        a.set_backlog_len(3);

        let families = registry.gather();
        let requests = families
            .iter()
            .find(|f| f.get_name() == "chroma_requests_processed_total")
            .unwrap();
        assert_eq!(requests.get_metric().len(), 1);
        assert_eq!(requests.get_metric()[0].get_counter().get_value(), 2.0);
        assert!(PrometheusSink::install(&registry, "a").is_err());
    }
}
