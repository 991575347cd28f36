// Path: crates/test_utils/src/lib.rs
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

//! # Chroma Test Utilities
//!
//! Utilities for testing the Chroma chain VM components: an in-memory
//! ledger, contracts exercising every sandbox operation, and fixtures.

pub mod assertions;
pub mod contracts;
pub mod fixtures;
pub mod ledger;
