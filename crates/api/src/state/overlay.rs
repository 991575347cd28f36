// Path: crates/api/src/state/overlay.rs

//! A copy-on-write state overlay with nested checkpoints.

use crate::state::{StateAccess, StateKVPair, StateReader, StateScanIter};
use chroma_types::error::StateError;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter::{Fuse, Peekable};
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::sync::Arc;

/// A batch of key-value pairs to be inserted or updated in the state.
pub type StateInserts = Vec<(Vec<u8>, Vec<u8>)>;

/// A batch of keys to be deleted from the state.
pub type StateDeletes = Vec<Vec<u8>>;

/// A complete set of state changes (inserts/updates and deletes), key-ordered.
pub type StateChangeSet = (StateInserts, StateDeletes);

/// Calculates the smallest byte vector that is strictly greater than all keys
/// starting with the given prefix. Returns None if the prefix is all 0xFF bytes.
fn next_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    if prefix.is_empty() {
        return None;
    }
    let mut ub = prefix.to_vec();
    while let Some(last) = ub.pop() {
        if last != 0xFF {
            ub.push(last + 1);
            return Some(ub);
        }
    }
    None
}

struct MergingIterator<'a> {
    base: Peekable<Fuse<StateScanIter<'a>>>,
    writes: Peekable<btree_map::Range<'a, Vec<u8>, Option<Vec<u8>>>>,
}

impl<'a> MergingIterator<'a> {
    fn take_write(&mut self) -> Option<Option<Result<StateKVPair, StateError>>> {
        let (key, val_opt) = self.writes.next()?;
        Some(
            val_opt
                .as_ref()
                .map(|val| Ok((Arc::from(key.as_slice()), Arc::from(val.as_slice())))),
        )
    }
}

impl<'a> Iterator for MergingIterator<'a> {
    type Item = Result<StateKVPair, StateError>;

    fn next(&mut self) -> Option<Self::Item> {
        use std::cmp::Ordering;
        loop {
            let base_key = match self.base.peek() {
                Some(Err(_)) => return self.base.next(),
                Some(Ok((k, _))) => Some(k.as_ref()),
                None => None,
            };
            let write_key = self.writes.peek().map(|(k, _)| k.as_slice());

            let decision = match (base_key, write_key) {
                (Some(bk), Some(wk)) => bk.cmp(wk),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => return None,
            };

            if decision == Ordering::Less {
                return self.base.next();
            }
            if decision == Ordering::Equal {
                self.base.next(); // shadowed by the overlay
            }
            // A pending delete yields nothing; keep merging.
            if let Some(Some(item)) = self.take_write() {
                return Some(item);
            }
        }
    }
}

/// A position in an overlay's write journal that can be reverted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

/// An in-memory, copy-on-write overlay for any `StateReader`.
///
/// Reads are first checked against the local `writes` cache. If a key is not
/// found, the read is passed through to the underlying `base` state. All writes
/// are captured in the local cache and do not affect the `base` state.
///
/// Every write is journaled with the value it replaced, so a [`Checkpoint`]
/// taken before a nested call can be restored exactly if the call fails.
#[derive(Clone)]
pub struct StateOverlay<'a> {
    base: &'a dyn StateReader,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>, // BTreeMap for deterministic commit order.
    journal: Vec<(Vec<u8>, Option<Option<Vec<u8>>>)>,
}

impl<'a> StateOverlay<'a> {
    /// Creates a new, empty overlay on top of a base state reader.
    pub fn new(base: &'a dyn StateReader) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    /// Marks the current position of the write journal.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    /// Undoes every write made after `checkpoint`, newest first.
    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some((key, previous)) = self.journal.pop() else {
                break;
            };
            match previous {
                Some(value) => {
                    self.writes.insert(key, value);
                }
                None => {
                    self.writes.remove(&key);
                }
            }
        }
    }

    /// Forgets the journal. Earlier checkpoints become invalid; the writes stay.
    pub fn discard_journal(&mut self) {
        self.journal.clear();
    }

    /// Whether the overlay holds no writes.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    fn record(&mut self, key: &[u8], value: Option<Vec<u8>>) {
        let previous = self.writes.insert(key.to_vec(), value);
        self.journal.push((key.to_vec(), previous));
    }

    /// Consumes the overlay and returns its writes in a deterministic order.
    pub fn into_ordered_batch(self) -> StateChangeSet {
        let mut inserts = Vec::new();
        let mut deletes = Vec::new();

        for (key, value_opt) in self.writes {
            match value_opt {
                Some(value) => inserts.push((key, value)),
                None => deletes.push(key),
            }
        }
        (inserts, deletes)
    }
}

impl<'a> StateReader for StateOverlay<'a> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        match self.writes.get(key) {
            // A cached `None` is a pending delete.
            Some(value_opt) => Ok(value_opt.clone()),
            None => self.base.get(key),
        }
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let base = self.base.prefix_scan(prefix)?.fuse().peekable();

        let start = Included(prefix.to_vec());
        let end = match next_prefix(prefix) {
            Some(ub) => Excluded(ub),
            None => Unbounded,
        };
        let writes = self.writes.range((start, end)).peekable();

        Ok(Box::new(MergingIterator { base, writes }))
    }
}

impl<'a> StateAccess for StateOverlay<'a> {
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.record(key, Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.record(key, None);
        Ok(())
    }
}
