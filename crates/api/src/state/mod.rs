// Path: crates/api/src/state/mod.rs
//! Core traits for state management.
//!
//! - `StateReader`: read-only key lookups and prefix scans.
//! - `StateAccess`: `StateReader` plus writes.
//! - `StateOverlay`: a copy-on-write layer with checkpoints, used by the
//!   executor to stage a block and to discard failed call chains.
//! - `NamespacedStateAccess` / `ReadOnlyNamespacedStateAccess`: contract-scoped
//!   views that prefix every key with the contract's hname.

use chroma_types::error::StateError;
use std::sync::Arc;

/// An atomically reference-counted, owned key slice.
pub type StateKey = Arc<[u8]>;
/// An atomically reference-counted, owned value slice.
pub type StateVal = Arc<[u8]>;
/// An owned key-value pair from the state, using cheap-to-clone Arcs.
pub type StateKVPair = (StateKey, StateVal);
/// A streaming iterator over key-value pairs from the state, in key order.
pub type StateScanIter<'a> = Box<dyn Iterator<Item = Result<StateKVPair, StateError>> + Send + 'a>;

mod accessor;
pub mod namespaced;
mod overlay;

pub use accessor::*;
pub use namespaced::{contract_namespace, NamespacedStateAccess, ReadOnlyNamespacedStateAccess};
pub use overlay::*;

#[cfg(test)]
mod tests;
