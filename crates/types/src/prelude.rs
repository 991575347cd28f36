// Path: crates/types/src/prelude.rs

//! Commonly used identifiers, the error code trait and small extension traits.

pub use crate::app::{AgentId, ColoredBalances, ContractId, Hname, Params};
pub use crate::error::{ErrorCode, VmError};

/// Turns an absent state record into a caller-chosen error.
pub trait OptionExt<T> {
    /// `Ok` with the value, or `Err(err)` when absent.
    fn required<E>(self, err: E) -> Result<T, E>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required<E>(self, err: E) -> Result<T, E> {
        self.ok_or(err)
    }
}
