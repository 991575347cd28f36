// Path: crates/api/src/state/namespaced.rs

//! State access wrappers that confine a contract to its own key namespace.

use crate::state::{StateAccess, StateReader, StateScanIter};
use chroma_types::app::Hname;
use chroma_types::error::StateError;
use std::sync::Arc;

/// The fixed-width key prefix of a contract's namespace.
pub fn contract_namespace(hname: Hname) -> [u8; 4] {
    hname.to_bytes()
}

#[inline]
fn qualify(prefix: &[u8; 4], key: &[u8]) -> Vec<u8> {
    [prefix.as_slice(), key].concat()
}

/// Scans `inner` under `prefix ++ local_prefix` and strips the namespace from
/// the returned keys, so contract code only ever sees its local keys.
fn scan_local<'a, R: StateReader + ?Sized>(
    inner: &'a R,
    prefix: [u8; 4],
    local_prefix: &[u8],
) -> Result<StateScanIter<'a>, StateError> {
    let iter = inner.prefix_scan(&qualify(&prefix, local_prefix))?;
    Ok(Box::new(iter.map(move |item| {
        let (key, value) = item?;
        let local = key.strip_prefix(prefix.as_slice()).ok_or_else(|| {
            StateError::Validation("scanned key outside of contract namespace".into())
        })?;
        Ok((Arc::from(local), value))
    })))
}

/// Mutable access to a single contract's namespace.
///
/// Every key is prefixed with the contract's hname; there is no way to name a
/// key outside the namespace through this handle.
pub struct NamespacedStateAccess<'a> {
    inner: &'a mut dyn StateAccess,
    prefix: [u8; 4],
}

impl<'a> NamespacedStateAccess<'a> {
    /// Creates a namespaced accessor for the contract `hname`.
    pub fn new(inner: &'a mut dyn StateAccess, hname: Hname) -> Self {
        Self {
            inner,
            prefix: contract_namespace(hname),
        }
    }
}

impl<'a> StateReader for NamespacedStateAccess<'a> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.inner.get(&qualify(&self.prefix, key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        scan_local(&*self.inner, self.prefix, prefix)
    }
}

impl<'a> StateAccess for NamespacedStateAccess<'a> {
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        if value.len() > chroma_types::MAX_STATE_VALUE_BYTES {
            return Err(StateError::InvalidValue(format!(
                "value of {} bytes exceeds the limit",
                value.len()
            )));
        }
        self.inner.insert(&qualify(&self.prefix, key), value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.inner.delete(&qualify(&self.prefix, key))
    }
}

/// Read-only access to a single contract's namespace.
///
/// This is the only state handle a view call receives; it implements
/// [`StateReader`] and nothing else.
pub struct ReadOnlyNamespacedStateAccess<'a> {
    inner: &'a dyn StateReader,
    prefix: [u8; 4],
}

impl<'a> ReadOnlyNamespacedStateAccess<'a> {
    /// Creates a read-only namespaced accessor for the contract `hname`.
    pub fn new(inner: &'a dyn StateReader, hname: Hname) -> Self {
        Self {
            inner,
            prefix: contract_namespace(hname),
        }
    }
}

impl<'a> StateReader for ReadOnlyNamespacedStateAccess<'a> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.inner.get(&qualify(&self.prefix, key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        scan_local(self.inner, self.prefix, prefix)
    }
}
