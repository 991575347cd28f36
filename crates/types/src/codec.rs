// crates/types/src/codec.rs

//! The canonical, deterministic binary codec for everything written to chain
//! state or fed into a block hash.
//!
//! These are thin wrappers around `parity-scale-codec` (SCALE). Keeping them in
//! the base crate means the executor, the core contracts and the tests all
//! produce the exact same bytes for the same value, which the replay contract
//! depends on.

use crate::error::StateError;
use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical SCALE byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from its canonical SCALE byte representation.
///
/// Trailing bytes are rejected, so every value has exactly one accepted
/// encoding.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, StateError> {
    T::decode_all(&mut &*b).map_err(|e| StateError::Decode(format!("canonical decode failed: {}", e)))
}
