// Path: crates/types/src/keys/mod.rs
//! Well-known contract names, entry points and the state key layout.
//!
//! Every key in the virtual state is the 4-byte hname of the owning contract
//! followed by a contract-local key. The constants below are the local keys
//! and prefixes used by the core contracts.

use crate::app::{AgentId, Color, HashValue, Hname};
use parity_scale_codec::Encode;

/// Name of the root contract (registry, permissions, fees, chain info).
pub const ROOT_CONTRACT: &str = "root";
/// Name of the accounts contract (colored balances).
pub const ACCOUNTS_CONTRACT: &str = "accounts";
/// Name of the blob contract (program binaries and other data blobs).
pub const BLOB_CONTRACT: &str = "blob";

/// Entry point called synchronously when a contract is deployed.
pub const INIT_ENTRY_POINT: &str = "init";

/// Local key of the `ChainInfo` record in the root contract.
pub const CHAIN_INFO_KEY: &[u8] = b"i";
/// Local prefix of contract records in the root contract.
pub const CONTRACT_REGISTRY_PREFIX: &[u8] = b"c";
/// Local prefix of deploy permissions in the root contract.
pub const DEPLOY_PERMISSION_PREFIX: &[u8] = b"d";

/// Local prefix of balances in the accounts contract.
pub const BALANCE_PREFIX: &[u8] = b"b";
/// Local prefix of the account list in the accounts contract.
pub const ACCOUNT_LIST_PREFIX: &[u8] = b"l";
/// Local prefix of per-color chain totals in the accounts contract.
pub const TOTAL_ASSETS_PREFIX: &[u8] = b"t";

/// Local prefix of blob field-size tables in the blob contract.
pub const BLOB_INFO_PREFIX: &[u8] = b"h";
/// Local prefix of blob fields in the blob contract.
pub const BLOB_FIELD_PREFIX: &[u8] = b"f";
/// Blob field naming the VM type of a program.
pub const BLOB_FIELD_VM_TYPE: &str = "v";
/// Blob field holding a program binary.
pub const BLOB_FIELD_PROGRAM_BINARY: &str = "p";
/// Blob field holding a program description.
pub const BLOB_FIELD_DESCRIPTION: &str = "d";

/// The hname of the root contract.
pub fn root_hname() -> Hname {
    Hname::of(ROOT_CONTRACT)
}

/// The hname of the accounts contract.
pub fn accounts_hname() -> Hname {
    Hname::of(ACCOUNTS_CONTRACT)
}

/// The hname of the blob contract.
pub fn blob_hname() -> Hname {
    Hname::of(BLOB_CONTRACT)
}

/// Whether `hname` belongs to one of the core contracts.
pub fn is_core_contract(hname: Hname) -> bool {
    hname == root_hname() || hname == accounts_hname() || hname == blob_hname()
}

/// Prefixes a contract-local key with the contract's namespace.
pub fn contract_key(hname: Hname, local: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + local.len());
    key.extend_from_slice(&hname.to_bytes());
    key.extend_from_slice(local);
    key
}

fn local_key(prefix: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut key = prefix.to_vec();
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// Root-local key of a contract record.
pub fn contract_record_key(hname: Hname) -> Vec<u8> {
    local_key(CONTRACT_REGISTRY_PREFIX, &[&hname.to_bytes()])
}

/// Root-local key of a deploy permission.
pub fn deploy_permission_key(agent: &AgentId) -> Vec<u8> {
    local_key(DEPLOY_PERMISSION_PREFIX, &[&agent.encode()])
}

/// Accounts-local prefix of all balances of `agent`.
pub fn agent_balance_prefix(agent: &AgentId) -> Vec<u8> {
    local_key(BALANCE_PREFIX, &[&agent.encode()])
}

/// Accounts-local key of one balance.
pub fn balance_key(agent: &AgentId, color: &Color) -> Vec<u8> {
    local_key(BALANCE_PREFIX, &[&agent.encode(), &color.0])
}

/// Accounts-local key of an account list entry.
pub fn account_list_key(agent: &AgentId) -> Vec<u8> {
    local_key(ACCOUNT_LIST_PREFIX, &[&agent.encode()])
}

/// Accounts-local key of a per-color chain total.
pub fn total_assets_key(color: &Color) -> Vec<u8> {
    local_key(TOTAL_ASSETS_PREFIX, &[&color.0])
}

/// Blob-local key of a blob's field-size table.
pub fn blob_info_key(hash: &HashValue) -> Vec<u8> {
    local_key(BLOB_INFO_PREFIX, &[&hash.0])
}

/// Blob-local key of one blob field.
pub fn blob_field_key(hash: &HashValue, field: &[u8]) -> Vec<u8> {
    local_key(BLOB_FIELD_PREFIX, &[&hash.0, field])
}
