// Path: crates/types/src/app/identifiers.rs
//! Hashes, handles and the agent address space.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The length in bytes of every hash and 32-byte identifier in the system.
pub const HASH_SIZE: usize = 32;

/// A 32-byte SHA-256 digest.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct HashValue(pub [u8; HASH_SIZE]);

impl HashValue {
    /// The all-zero hash, used as the previous hash of the origin block.
    pub const NIL: HashValue = HashValue([0u8; HASH_SIZE]);

    /// Hashes the concatenation of `parts`.
    pub fn digest(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    /// Returns the raw bytes of the hash.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Parses a hash from a byte slice of exactly [`HASH_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; HASH_SIZE]>::try_from(bytes).ok().map(Self)
    }
}

impl fmt::Debug for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashValue({})", hex::encode(self.0))
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A 32-bit handle of a contract or entry point name.
///
/// The hname of a contract is also the fixed-width prefix of every state key
/// the contract owns.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct Hname(pub u32);

impl Hname {
    /// Derives the hname of a name from the first four bytes of its hash.
    pub fn of(name: &str) -> Self {
        let h = HashValue::digest(&[name.as_bytes()]);
        let [a, b, c, d, ..] = h.0;
        Self(u32::from_be_bytes([a, b, c, d]))
    }

    /// Big-endian bytes, as used for state key prefixes.
    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for Hname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hname({:08x})", self.0)
    }
}

impl fmt::Display for Hname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

macro_rules! byte_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize,
            Deserialize,
        )]
        pub struct $name(pub [u8; HASH_SIZE]);

        impl $name {
            /// Returns the raw bytes of the identifier.
            pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
                &self.0
            }
        }

        impl From<HashValue> for $name {
            fn from(h: HashValue) -> Self {
                Self(h.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..8]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }
    };
}

byte_id!(
    /// The identity of a chain.
    ChainId
);
byte_id!(
    /// An address on the underlying ledger.
    Address
);
byte_id!(
    /// The identity of a ledger transaction.
    TxId
);

/// A token color. [`Color::BASE`] is the base fungible token.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct Color(pub [u8; HASH_SIZE]);

impl Color {
    /// The reserved color of the base fungible token.
    pub const BASE: Color = Color([0u8; HASH_SIZE]);

    /// Parses a color from a byte slice of exactly [`HASH_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; HASH_SIZE]>::try_from(bytes).ok().map(Self)
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::BASE {
            f.write_str("Color(BASE)")
        } else {
            write!(f, "Color({})", hex::encode(&self.0[..8]))
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::BASE {
            f.write_str("BASE")
        } else {
            f.write_str(&hex::encode(self.0))
        }
    }
}

/// The chain-scoped identity of a deployed contract.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct ContractId {
    /// The chain the contract lives on.
    pub chain_id: ChainId,
    /// The hname of the contract name.
    pub hname: Hname,
}

impl ContractId {
    /// Creates a contract identifier.
    pub fn new(chain_id: ChainId, hname: Hname) -> Self {
        Self { chain_id, hname }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", hex::encode(&self.chain_id.0[..8]), self.hname)
    }
}

/// An owner of colored balances: a ledger address or a contract on some chain.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub enum AgentId {
    /// An address on the underlying ledger.
    Address(Address),
    /// A contract on some chain.
    Contract(ContractId),
}

impl AgentId {
    /// Returns the ledger address if this agent is one.
    pub fn address(&self) -> Option<&Address> {
        match self {
            Self::Address(a) => Some(a),
            Self::Contract(_) => None,
        }
    }

    /// Returns the contract identifier if this agent is a contract.
    pub fn contract(&self) -> Option<&ContractId> {
        match self {
            Self::Address(_) => None,
            Self::Contract(c) => Some(c),
        }
    }
}

impl From<Address> for AgentId {
    fn from(a: Address) -> Self {
        Self::Address(a)
    }
}

impl From<ContractId> for AgentId {
    fn from(c: ContractId) -> Self {
        Self::Contract(c)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(a) => write!(f, "A/{}", hex::encode(&a.0[..8])),
            Self::Contract(c) => write!(f, "C/{}", c),
        }
    }
}

/// The globally unique identity of a request: its originating ledger
/// transaction and the index of the request section inside it.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Encode,
    Decode,
    Serialize,
    Deserialize,
)]
pub struct RequestId {
    /// The ledger transaction carrying the request.
    pub tx_id: TxId,
    /// The section index within that transaction.
    pub index: u16,
}

impl RequestId {
    /// Creates a request identifier.
    pub fn new(tx_id: TxId, index: u16) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", hex::encode(&self.tx_id.0[..8]), self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hname_is_stable_and_name_dependent() {
        assert_eq!(Hname::of("root"), Hname::of("root"));
        assert_ne!(Hname::of("root"), Hname::of("accounts"));
        let h = HashValue::digest(&[b"root"]);
        assert_eq!(Hname::of("root").to_bytes(), [h.0[0], h.0[1], h.0[2], h.0[3]]);
    }

    #[test]
    fn digest_concatenates_parts() {
        assert_eq!(
            HashValue::digest(&[b"ab", b"c"]),
            HashValue::digest(&[b"abc"])
        );
    }

    #[test]
    fn agent_encoding_is_prefix_free() {
        let addr = AgentId::Address(Address([7u8; 32]));
        let contract = AgentId::Contract(ContractId::new(ChainId([7u8; 32]), Hname(1)));
        let a = addr.encode();
        let c = contract.encode();
        assert_eq!(a.len(), 33);
        assert_eq!(c.len(), 37);
        assert_ne!(a.first(), c.first());
    }
}
