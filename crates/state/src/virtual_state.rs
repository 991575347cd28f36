// Path: crates/state/src/virtual_state.rs

use crate::block::compute_state_hash;
use chroma_api::state::{StateReader, StateScanIter};
use chroma_types::app::{Block, BlockHeader, ChainId, HashValue};
use chroma_types::error::{BlockError, StateError};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// The versioned key/value state of one chain.
///
/// The state only changes by whole blocks: [`apply_block`](Self::apply_block)
/// validates and stages a block, [`commit`](Self::commit) makes it visible and
/// advances the block index. Reads through [`StateReader`] always see the last
/// committed block, never a staged one. There is no write method:
/// contract code and the executor stage their mutations in an overlay and hand
/// back a sealed block.
pub struct VirtualState {
    chain_id: ChainId,
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    latest: Option<BlockHeader>,
    pending: Option<Block>,
    recent: VecDeque<BlockHeader>,
    recent_limit: usize,
}

impl VirtualState {
    /// Creates an empty state with no origin block.
    pub fn new(chain_id: ChainId, recent_limit: usize) -> Self {
        Self {
            chain_id,
            data: BTreeMap::new(),
            latest: None,
            pending: None,
            recent: VecDeque::new(),
            recent_limit: recent_limit.max(1),
        }
    }

    /// The chain this state belongs to.
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Whether the origin block has been committed.
    pub fn is_initialized(&self) -> bool {
        self.latest.is_some()
    }

    /// Index of the last committed block (0 before and right after origin).
    pub fn block_index(&self) -> u64 {
        self.latest.as_ref().map_or(0, |h| h.index)
    }

    /// The index the next block must carry.
    pub fn next_block_index(&self) -> u64 {
        self.latest.as_ref().map_or(0, |h| h.index.saturating_add(1))
    }

    /// Hash of the last committed state; NIL before origin.
    pub fn state_hash(&self) -> HashValue {
        self.latest.as_ref().map_or(HashValue::NIL, |h| h.state_hash)
    }

    /// Logical time of the last committed block.
    pub fn timestamp(&self) -> u64 {
        self.latest.as_ref().map_or(0, |h| h.timestamp)
    }

    /// Header of the last committed block.
    pub fn latest_header(&self) -> Option<&BlockHeader> {
        self.latest.as_ref()
    }

    /// Recently committed headers, oldest first.
    pub fn recent_headers(&self) -> impl Iterator<Item = &BlockHeader> + '_ {
        self.recent.iter()
    }

    /// Whether a block is staged.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no key is committed.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Validates `block` against the committed state and stages it.
    pub fn apply_block(&mut self, block: Block) -> Result<(), BlockError> {
        if self.pending.is_some() {
            return Err(BlockError::AlreadyPending);
        }
        let expected = self.next_block_index();
        if block.header.index != expected {
            return Err(BlockError::InvalidIndex {
                expected,
                got: block.header.index,
            });
        }
        let current = self.state_hash();
        if block.header.prev_state_hash != current {
            return Err(BlockError::MismatchedPrevHash {
                expected: current,
                got: block.header.prev_state_hash,
            });
        }
        let computed = compute_state_hash(
            &block.header.prev_state_hash,
            &block.inserts,
            &block.deletes,
            &block.header.anchor,
        );
        if computed != block.header.state_hash {
            return Err(BlockError::MismatchedStateHash {
                computed,
                declared: block.header.state_hash,
            });
        }
        self.pending = Some(block);
        Ok(())
    }

    /// Applies the staged block and advances the block index.
    pub fn commit(&mut self) -> Result<BlockHeader, BlockError> {
        let block = self.pending.take().ok_or(BlockError::NothingPending)?;
        for key in &block.deletes {
            self.data.remove(key);
        }
        for (key, value) in block.inserts {
            self.data.insert(key, value);
        }
        tracing::debug!(
            target: "state",
            event = "block_committed",
            chain = %self.chain_id,
            index = block.header.index,
            state_hash = %block.header.state_hash,
        );
        if self.recent.len() >= self.recent_limit {
            self.recent.pop_front();
        }
        self.recent.push_back(block.header.clone());
        self.latest = Some(block.header.clone());
        Ok(block.header)
    }

    /// Drops the staged block, if any.
    pub fn discard_pending(&mut self) -> Option<Block> {
        self.pending.take()
    }
}

impl StateReader for VirtualState {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.data.get(key).cloned())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let owned = prefix.to_vec();
        let iter = self
            .data
            .range(owned.clone()..)
            .take_while(move |(k, _)| k.starts_with(&owned))
            .map(|(k, v)| Ok((Arc::from(k.as_slice()), Arc::from(v.as_slice()))));
        Ok(Box::new(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::seal_block;
    use chroma_types::app::TxId;

    fn origin(state: &VirtualState) -> Block {
        seal_block(
            state.next_block_index(),
            state.state_hash(),
            TxId([1; 32]),
            0,
            vec![],
            (vec![(b"genesis".to_vec(), b"1".to_vec())], vec![]),
        )
    }

    #[test]
    fn staged_block_is_invisible_until_commit() {
        let mut state = VirtualState::new(ChainId([7; 32]), 8);
        state.apply_block(origin(&state)).unwrap();
        assert_eq!(state.get(b"genesis").unwrap(), None);
        assert!(!state.is_initialized());

        let header = state.commit().unwrap();
        assert_eq!(header.index, 0);
        assert!(state.is_initialized());
        assert_eq!(state.get(b"genesis").unwrap(), Some(b"1".to_vec()));
        assert_eq!(state.next_block_index(), 1);
        assert_eq!(state.state_hash(), header.state_hash);
    }

    #[test]
    fn blocks_must_extend_the_chain() {
        let mut state = VirtualState::new(ChainId([7; 32]), 8);
        state.apply_block(origin(&state)).unwrap();
        state.commit().unwrap();

        let skipped = seal_block(2, state.state_hash(), TxId([2; 32]), 1, vec![], (vec![], vec![]));
        assert!(matches!(
            state.apply_block(skipped),
            Err(BlockError::InvalidIndex { expected: 1, got: 2 })
        ));

        let forked = seal_block(1, HashValue([3; 32]), TxId([2; 32]), 1, vec![], (vec![], vec![]));
        assert!(matches!(
            state.apply_block(forked),
            Err(BlockError::MismatchedPrevHash { .. })
        ));

        let mut tampered = seal_block(1, state.state_hash(), TxId([2; 32]), 1, vec![], (vec![], vec![]));
        tampered.inserts.push((b"x".to_vec(), b"y".to_vec()));
        assert!(matches!(
            state.apply_block(tampered),
            Err(BlockError::MismatchedStateHash { .. })
        ));
        assert!(!state.has_pending());
    }

    #[test]
    fn deletes_apply_and_recent_headers_are_bounded() {
        let mut state = VirtualState::new(ChainId([7; 32]), 2);
        state.apply_block(origin(&state)).unwrap();
        state.commit().unwrap();

        for i in 1..=3u8 {
            let block = seal_block(
                state.next_block_index(),
                state.state_hash(),
                TxId([i; 32]),
                u64::from(i),
                vec![],
                (vec![], vec![b"genesis".to_vec()]),
            );
            state.apply_block(block).unwrap();
            state.commit().unwrap();
        }
        assert_eq!(state.get(b"genesis").unwrap(), None);
        assert_eq!(state.block_index(), 3);
        let indices: Vec<u64> = state.recent_headers().map(|h| h.index).collect();
        assert_eq!(indices, vec![2, 3]);
    }

    #[test]
    fn second_stage_is_refused_and_discard_clears() {
        let mut state = VirtualState::new(ChainId([7; 32]), 8);
        state.apply_block(origin(&state)).unwrap();
        assert!(matches!(
            state.apply_block(origin(&state)),
            Err(BlockError::AlreadyPending)
        ));
        assert!(state.discard_pending().is_some());
        assert!(matches!(state.commit(), Err(BlockError::NothingPending)));
    }
}
