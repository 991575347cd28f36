// Path: crates/types/src/app/mod.rs
//! Core application-level data structures for the chain VM.

mod balances;
mod block;
mod contract;
mod identifiers;
mod params;
mod request;

pub use balances::*;
pub use block::*;
pub use contract::*;
pub use identifiers::*;
pub use params::*;
pub use request::*;
