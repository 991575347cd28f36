// Path: crates/api/src/vm/randomness.rs

use chroma_types::app::{HashValue, TxId};

/// Entropy pinned to a block's anchoring data.
///
/// Every node re-executing the same block derives the same values, so
/// contracts can branch on them without breaking replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entropy(pub HashValue);

impl Entropy {
    /// Derives block entropy from the anchoring transaction and the state the
    /// block builds on.
    pub fn for_block(anchor: &TxId, prev_state_hash: &HashValue) -> Self {
        // H(tag || anchor || prev_state_hash)
        Self(HashValue::digest(&[
            b"chroma/entropy",
            anchor.as_bytes(),
            prev_state_hash.as_bytes(),
        ]))
    }

    /// Derives the entropy of the request at `index` within the block.
    pub fn for_request(&self, index: usize) -> HashValue {
        HashValue::digest(&[self.0.as_bytes(), &(index as u64).to_be_bytes()])
    }

    /// The first eight bytes as a `u64`, for seeding standard RNGs.
    pub fn as_u64(&self) -> u64 {
        let [a, b, c, d, e, f, g, h, ..] = self.0 .0;
        u64::from_le_bytes([a, b, c, d, e, f, g, h])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_depends_on_anchor_and_index() {
        let prev = HashValue::digest(&[b"prev"]);
        let a = Entropy::for_block(&TxId([1u8; 32]), &prev);
        let b = Entropy::for_block(&TxId([2u8; 32]), &prev);
        assert_ne!(a, b);
        assert_eq!(a, Entropy::for_block(&TxId([1u8; 32]), &prev));
        assert_ne!(a.for_request(0), a.for_request(1));
        assert_eq!(a.for_request(3), a.for_request(3));
    }
}
