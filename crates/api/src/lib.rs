// Path: crates/api/src/lib.rs

//! # Chroma API Crate Lints
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
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
#![deny(missing_docs)]
//! # Chroma API
//!
//! Core traits and capability interfaces of the chain VM. This crate defines
//! the seams between the executor, contract code, chain governance policy and
//! the external ledger.

/// The external ledger collaborator.
pub mod ledger;
/// Pluggable governance hooks consulted by the executor.
pub mod policy;
/// Key/value state access traits, the copy-on-write overlay and namespacing.
pub mod state;
/// Capability interfaces handed to contract code and the processor model.
pub mod vm;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::ledger::Level1Client;
    pub use crate::policy::{DeployPolicy, FeePolicy};
    pub use crate::state::{StateAccess, StateOverlay, StateReader};
    pub use crate::vm::{
        ContractInterface, ContractLogger, ContractProcessor, PrivilegedSandbox, Sandbox,
        SandboxBase, SandboxView,
    };
}
