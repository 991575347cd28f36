// Path: crates/execution/src/core_contracts/mod.rs
//! The core contracts every chain is born with.
//!
//! - `root`: contract registry, deploy permissions, fees and chain ownership.
//! - `accounts`: deposits, withdrawals and balance queries.
//! - `blob`: content-addressed storage of program binaries and other data.

pub mod accounts;
pub mod blob;
pub mod root;

use chroma_api::vm::ContractInterface;

/// The interfaces of all core contracts.
pub fn interfaces() -> [ContractInterface; 3] {
    [root::interface(), accounts::interface(), blob::interface()]
}
