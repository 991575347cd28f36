// Path: crates/execution/src/lib.rs
//! # Chroma Execution Crate Lints
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
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]
//! # Chroma Execution
//!
//! The deterministic batch executor. An [`Executor`] runs a [`Batch`] of
//! requests against one [`VirtualState`] snapshot, dispatching into contract
//! code through the `Sandbox` / `SandboxView` capability interfaces, and
//! produces exactly one sealed block.
//!
//! [`Batch`]: chroma_types::app::Batch
//! [`VirtualState`]: chroma_state::VirtualState

mod context;
pub mod core_contracts;
mod environment;
mod executor;
pub mod genesis;
pub mod policy;

pub use environment::{VmEnvironment, VmEnvironmentBuilder, VmTypeRegistry};
pub use executor::{BatchOutput, Executor};
pub use genesis::{origin_block, GenesisParams};
