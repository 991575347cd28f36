// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
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

//! # Chroma Types
//!
//! This crate is the foundational library for the Chroma chain VM, containing
//! the core data structures, error types, and configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `chroma-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. It provides the
//! canonical definitions for shared types like `RequestRef`, `Block`,
//! `AgentId`, `ColoredBalances` and the error enums, so that the executor, the
//! chain pipeline and contract code all agree on one binary representation.

/// The maximum size in bytes for a single value written to chain state.
pub const MAX_STATE_VALUE_BYTES: usize = 256 * 1024; // 256 KiB

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::VmError> = std::result::Result<T, E>;

/// Core application-level data structures like `RequestRef`, `Block`, and `AgentId`.
pub mod app;
/// The canonical, deterministic binary codec for consensus-critical state.
pub mod codec;
/// Chain configuration structures.
pub mod config;
/// A unified set of all error types used across the workspace.
pub mod error;
/// Well-known contract names, entry points and the state key layout.
pub mod keys;
/// A prelude containing useful extension traits like `OptionExt`.
pub mod prelude;
