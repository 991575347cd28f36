// Path: crates/telemetry/src/time.rs
use crate::sinks::ChainMetricsSink;
use std::time::{Duration, Instant};

/// Measures one batch. The duration is reported to the sink when the timer
/// is dropped, including on early returns.
pub struct BatchTimer<'a> {
    sink: &'a dyn ChainMetricsSink,
    start: Instant,
}

impl<'a> BatchTimer<'a> {
    pub fn start(sink: &'a dyn ChainMetricsSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for BatchTimer<'_> {
    fn drop(&mut self) {
        self.sink.observe_batch_duration(self.elapsed().as_secs_f64());
    }
}
