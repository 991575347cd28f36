// Path: crates/state/src/lib.rs
//! # Chroma State Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # Chroma State
//!
//! The per-chain virtual state: an ordered key/value store that only ever
//! changes by whole blocks, the hash chain linking those blocks, and the
//! colored-balance ledger kept in the accounts contract's key range.

pub mod accounts;
pub mod block;
mod virtual_state;

pub use virtual_state::VirtualState;

/// A prelude for easily importing the most common types.
pub mod prelude {
    pub use crate::accounts;
    pub use crate::block::{compute_state_hash, seal_block};
    pub use crate::VirtualState;
}
