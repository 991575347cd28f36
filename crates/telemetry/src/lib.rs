// Path: crates/telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Chroma Telemetry
//!
//! This crate provides the observability infrastructure for Chroma chains:
//! structured logging initialization, an abstract metrics sink that keeps
//! instrumentation decoupled from the backend, and a Prometheus
//! implementation of that sink.

/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of the metrics sink using the `prometheus` crate.
pub mod prometheus;
/// The abstract `ChainMetricsSink` trait and its no-op implementation.
pub mod sinks;
/// A simple RAII timer for measuring the duration of a scope.
pub mod time;

pub use init::init_tracing;
pub use sinks::{ChainMetricsSink, NopSink};
