// Path: crates/state/src/block.rs
//! Block sealing and the state hash chain.

use chroma_api::state::StateChangeSet;
use chroma_types::app::{Block, BlockHeader, HashValue, RequestId, TxId};
use parity_scale_codec::Encode;

/// Computes the state hash a block commits to.
///
/// The hash covers the previous state hash, the key-ordered mutation set and
/// the anchoring transaction, so a snapshot is identified by the exact batch
/// sequence that produced it.
pub fn compute_state_hash(
    prev_state_hash: &HashValue,
    inserts: &[(Vec<u8>, Vec<u8>)],
    deletes: &[Vec<u8>],
    anchor: &TxId,
) -> HashValue {
    HashValue::digest(&[
        b"chroma/block",
        prev_state_hash.as_bytes(),
        &inserts.encode(),
        &deletes.encode(),
        anchor.as_bytes(),
    ])
}

/// Builds a block from an ordered change set.
pub fn seal_block(
    index: u64,
    prev_state_hash: HashValue,
    anchor: TxId,
    timestamp: u64,
    request_ids: Vec<RequestId>,
    changes: StateChangeSet,
) -> Block {
    let (inserts, deletes) = changes;
    let state_hash = compute_state_hash(&prev_state_hash, &inserts, &deletes, &anchor);
    Block {
        header: BlockHeader {
            index,
            prev_state_hash,
            state_hash,
            anchor,
            timestamp,
            request_ids,
        },
        inserts,
        deletes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_binds_prev_mutations_and_anchor() {
        let inserts = vec![(b"k".to_vec(), b"v".to_vec())];
        let base = compute_state_hash(&HashValue::NIL, &inserts, &[], &TxId([1; 32]));

        assert_eq!(
            base,
            compute_state_hash(&HashValue::NIL, &inserts, &[], &TxId([1; 32]))
        );
        assert_ne!(
            base,
            compute_state_hash(&HashValue([9; 32]), &inserts, &[], &TxId([1; 32]))
        );
        assert_ne!(
            base,
            compute_state_hash(&HashValue::NIL, &inserts, &[b"k".to_vec()], &TxId([1; 32]))
        );
        assert_ne!(
            base,
            compute_state_hash(&HashValue::NIL, &inserts, &[], &TxId([2; 32]))
        );
    }

    #[test]
    fn sealed_header_carries_computed_hash() {
        let block = seal_block(
            3,
            HashValue([5; 32]),
            TxId([6; 32]),
            42,
            vec![],
            (vec![(b"a".to_vec(), b"1".to_vec())], vec![]),
        );
        assert_eq!(
            block.header.state_hash,
            compute_state_hash(&block.header.prev_state_hash, &block.inserts, &block.deletes, &block.header.anchor)
        );
        assert_eq!(block.index(), 3);
    }
}
