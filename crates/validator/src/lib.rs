// Path: crates/validator/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]

//! # Chroma Chain Pipeline
//!
//! Runs one chain: requests observed on the ledger are appended to a
//! [`Backlog`](backlog::Backlog), the [`BatchCollator`](collator::BatchCollator)
//! picks the ones whose time lock has elapsed, and the [`Chain`] executes
//! them as one batch, anchors the resulting block on the ledger and commits
//! it. Each chain owns its pipeline; chains share nothing but the ledger.

pub mod backlog;
pub mod chain;
pub mod collator;
pub mod config;
pub mod ingestion;

pub use chain::{batch_anchor, BatchReport, Chain, ChainParams, RequestHandle};
pub use config::load_chain_config;
