// Path: crates/api/src/state/accessor.rs
//! Defines the `StateReader` and `StateAccess` traits for key-value storage operations.

use crate::state::StateScanIter;
use chroma_types::error::StateError;

/// A dyn-safe, read-only view of key/value state.
pub trait StateReader: Send + Sync {
    /// Gets a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;

    /// Whether a value is stored under `key`.
    fn has(&self, key: &[u8]) -> Result<bool, StateError> {
        Ok(self.get(key)?.is_some())
    }

    /// Scans for all key-value pairs starting with the given prefix, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError>;
}

/// A dyn-safe trait that adds writes to [`StateReader`].
pub trait StateAccess: StateReader {
    /// Inserts a key-value pair.
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError>;

    /// Deletes a key-value pair.
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError>;

    /// Applies a batch of deletes followed by inserts.
    fn batch_apply(
        &mut self,
        inserts: &[(Vec<u8>, Vec<u8>)],
        deletes: &[Vec<u8>],
    ) -> Result<(), StateError> {
        for key in deletes {
            self.delete(key)?;
        }
        for (key, value) in inserts {
            self.insert(key, value)?;
        }
        Ok(())
    }
}

// Blanket implementations to allow the traits to be used behind a `Box` trait object.
impl<T: StateReader + ?Sized> StateReader for Box<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        (**self).get(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        (**self).prefix_scan(prefix)
    }
}

impl<T: StateAccess + ?Sized> StateAccess for Box<T> {
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        (**self).insert(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        (**self).delete(key)
    }
}
