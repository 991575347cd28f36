// Path: crates/api/src/state/tests/mod.rs

use super::*;
use chroma_types::app::Hname;
use chroma_types::error::StateError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A minimal committed store for exercising overlays.
#[derive(Default)]
struct MemState(BTreeMap<Vec<u8>, Vec<u8>>);

impl MemState {
    fn with(mut self, k: &[u8], v: &[u8]) -> Self {
        self.0.insert(k.to_vec(), v.to_vec());
        self
    }
}

impl StateReader for MemState {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.0.get(key).cloned())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let prefix = prefix.to_vec();
        Ok(Box::new(
            self.0
                .range(prefix.clone()..)
                .take_while(move |(k, _)| k.starts_with(&prefix))
                .map(|(k, v)| Ok((Arc::from(k.as_slice()), Arc::from(v.as_slice())))),
        ))
    }
}

fn keys(iter: StateScanIter<'_>) -> Vec<Vec<u8>> {
    iter.map(|r| r.unwrap().0.to_vec()).collect()
}

#[test]
fn overlay_reads_through_and_shadows_base() {
    let base = MemState::default().with(b"a", b"1").with(b"b", b"2");
    let mut overlay = StateOverlay::new(&base);
    overlay.insert(b"a", b"10").unwrap();
    overlay.delete(b"b").unwrap();

    assert_eq!(overlay.get(b"a").unwrap(), Some(b"10".to_vec()));
    assert_eq!(overlay.get(b"b").unwrap(), None);
    assert_eq!(base.get(b"a").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn prefix_scan_merges_writes_and_deletes_in_order() {
    let base = MemState::default()
        .with(b"p1", b"x")
        .with(b"p3", b"x")
        .with(b"p5", b"x")
        .with(b"q1", b"x");
    let mut overlay = StateOverlay::new(&base);
    overlay.insert(b"p2", b"y").unwrap();
    overlay.delete(b"p3").unwrap();
    overlay.insert(b"p5", b"z").unwrap();

    assert_eq!(
        keys(overlay.prefix_scan(b"p").unwrap()),
        vec![b"p1".to_vec(), b"p2".to_vec(), b"p5".to_vec()]
    );
}

#[test]
fn revert_restores_exact_pre_checkpoint_view() {
    let base = MemState::default().with(b"k", b"base");
    let mut overlay = StateOverlay::new(&base);
    overlay.insert(b"k", b"outer").unwrap();

    let cp = overlay.checkpoint();
    overlay.insert(b"k", b"inner").unwrap();
    overlay.insert(b"new", b"v").unwrap();
    overlay.delete(b"k").unwrap();
    overlay.revert_to(cp);

    assert_eq!(overlay.get(b"k").unwrap(), Some(b"outer".to_vec()));
    assert_eq!(overlay.get(b"new").unwrap(), None);
    let (inserts, deletes) = overlay.into_ordered_batch();
    assert_eq!(inserts, vec![(b"k".to_vec(), b"outer".to_vec())]);
    assert!(deletes.is_empty());
}

#[test]
fn nested_checkpoints_unwind_independently() {
    let base = MemState::default();
    let mut overlay = StateOverlay::new(&base);
    let outer = overlay.checkpoint();
    overlay.insert(b"a", b"1").unwrap();
    let inner = overlay.checkpoint();
    overlay.insert(b"b", b"2").unwrap();

    overlay.revert_to(inner);
    assert_eq!(overlay.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(overlay.get(b"b").unwrap(), None);

    overlay.revert_to(outer);
    assert!(overlay.is_empty());
}

#[test]
fn namespaced_access_is_confined_to_its_prefix() {
    let base = MemState::default();
    let mut overlay = StateOverlay::new(&base);
    let alpha = Hname::of("alpha");
    let beta = Hname::of("beta");

    NamespacedStateAccess::new(&mut overlay, alpha)
        .insert(b"counter", b"1")
        .unwrap();
    NamespacedStateAccess::new(&mut overlay, beta)
        .insert(b"counter", b"2")
        .unwrap();

    let raw_key = [alpha.to_bytes().as_slice(), b"counter"].concat();
    assert_eq!(overlay.get(&raw_key).unwrap(), Some(b"1".to_vec()));

    let view = ReadOnlyNamespacedStateAccess::new(&overlay, beta);
    assert_eq!(view.get(b"counter").unwrap(), Some(b"2".to_vec()));
    assert_eq!(keys(view.prefix_scan(b"").unwrap()), vec![b"counter".to_vec()]);
}

#[test]
fn oversized_values_are_rejected() {
    let base = MemState::default();
    let mut overlay = StateOverlay::new(&base);
    let mut ns = NamespacedStateAccess::new(&mut overlay, Hname::of("big"));
    let value = vec![0u8; chroma_types::MAX_STATE_VALUE_BYTES + 1];
    assert!(matches!(
        ns.insert(b"k", &value),
        Err(StateError::InvalidValue(_))
    ));
}
