// Path: crates/types/src/app/params.rs
use super::{AgentId, Address, ChainId, Color, ColoredBalances, ContractId, HashValue, Hname};
use crate::codec;
use crate::error::VmError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value that can be stored in a [`Params`] mapping.
///
/// Integers are 8-byte little endian, strings are UTF-8, raw bytes are stored
/// verbatim and structured identifiers use the canonical codec.
pub trait ParamValue: Sized {
    /// Encodes the value.
    fn to_param_bytes(&self) -> Vec<u8>;
    /// Decodes the value, returning `None` on malformed input.
    fn from_param_bytes(bytes: &[u8]) -> Option<Self>;
}

impl ParamValue for i64 {
    fn to_param_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
    fn from_param_bytes(bytes: &[u8]) -> Option<Self> {
        <[u8; 8]>::try_from(bytes).ok().map(i64::from_le_bytes)
    }
}

impl ParamValue for u64 {
    fn to_param_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
    fn from_param_bytes(bytes: &[u8]) -> Option<Self> {
        <[u8; 8]>::try_from(bytes).ok().map(u64::from_le_bytes)
    }
}

impl ParamValue for bool {
    fn to_param_bytes(&self) -> Vec<u8> {
        vec![u8::from(*self)]
    }
    fn from_param_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0] => Some(false),
            [1] => Some(true),
            _ => None,
        }
    }
}

impl ParamValue for String {
    fn to_param_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
    fn from_param_bytes(bytes: &[u8]) -> Option<Self> {
        String::from_utf8(bytes.to_vec()).ok()
    }
}

impl ParamValue for Vec<u8> {
    fn to_param_bytes(&self) -> Vec<u8> {
        self.clone()
    }
    fn from_param_bytes(bytes: &[u8]) -> Option<Self> {
        Some(bytes.to_vec())
    }
}

macro_rules! canonical_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ParamValue for $ty {
                fn to_param_bytes(&self) -> Vec<u8> {
                    self.encode()
                }
                fn from_param_bytes(bytes: &[u8]) -> Option<Self> {
                    codec::from_bytes_canonical(bytes).ok()
                }
            }
        )*
    };
}

canonical_param!(Hname, HashValue, Color, ChainId, Address, AgentId, ContractId, ColoredBalances);

/// The argument or result mapping of a call: unique byte-string keys to
/// byte-string values, kept in key order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Params(BTreeMap<Vec<u8>, Vec<u8>>);

impl Params {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a typed value.
    pub fn with<T: ParamValue>(mut self, key: &str, value: T) -> Self {
        self.set(key, value);
        self
    }

    /// Inserts a typed value, replacing any previous one.
    pub fn set<T: ParamValue>(&mut self, key: &str, value: T) {
        self.0.insert(key.as_bytes().to_vec(), value.to_param_bytes());
    }

    /// Inserts raw bytes under a raw key.
    pub fn set_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.0.insert(key, value);
    }

    /// Raw bytes stored under `key`.
    pub fn get_raw(&self, key: &[u8]) -> Option<&[u8]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Removes and returns the raw bytes under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.0.remove(key.as_bytes())
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key.as_bytes())
    }

    /// Decodes an optional value.
    pub fn get<T: ParamValue>(&self, key: &str) -> Result<Option<T>, VmError> {
        match self.0.get(key.as_bytes()) {
            None => Ok(None),
            Some(bytes) => T::from_param_bytes(bytes)
                .map(Some)
                .ok_or_else(|| VmError::InvalidParameterEncoding(key.to_string())),
        }
    }

    /// Decodes a required value.
    pub fn require<T: ParamValue>(&self, key: &str) -> Result<T, VmError> {
        self.get(key)?
            .ok_or_else(|| VmError::MissingParameter(key.to_string()))
    }

    /// Decodes an optional value, falling back to `default` when absent.
    pub fn get_or<T: ParamValue>(&self, key: &str, default: T) -> Result<T, VmError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.0.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Vec<u8>, Vec<u8>)> for Params {
    fn from_iter<I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_values_decode_back() {
        let agent = AgentId::Address(Address([3u8; 32]));
        let p = Params::new()
            .with("n", -7i64)
            .with("name", "counter".to_string())
            .with("agent", agent);
        assert_eq!(p.require::<i64>("n").unwrap(), -7);
        assert_eq!(p.require::<String>("name").unwrap(), "counter");
        assert_eq!(p.require::<AgentId>("agent").unwrap(), agent);
    }

    #[test]
    fn missing_and_malformed_values_are_distinguished() {
        let mut p = Params::new();
        p.set_raw(b"n".to_vec(), vec![1, 2, 3]);
        assert!(matches!(
            p.require::<i64>("absent"),
            Err(VmError::MissingParameter(k)) if k == "absent"
        ));
        assert!(matches!(
            p.require::<i64>("n"),
            Err(VmError::InvalidParameterEncoding(k)) if k == "n"
        ));
        assert_eq!(p.get_or::<i64>("absent", 5).unwrap(), 5);
    }
}
