//! A VM type whose program binaries name a registered native contract

use chroma_api::vm::{ContractInterface, ContractProcessor, VmConstructor};
use chroma_types::app::Params;
use chroma_types::error::VmError;
use chroma_types::keys;
use std::collections::BTreeMap;
use std::sync::Arc;

/// VM type name under which [`native_vm`] is registered in tests
pub const NATIVE_VM_TYPE: &str = "native";

/// Builds a constructor that resolves a binary (a contract name in UTF-8) to
/// one of `contracts`.
pub fn native_vm(contracts: Vec<ContractInterface>) -> VmConstructor {
    let table: BTreeMap<String, Arc<dyn ContractProcessor>> = contracts
        .into_iter()
        .map(|c| {
            let name = c.contract_name().to_string();
            (name, Arc::new(c) as Arc<dyn ContractProcessor>)
        })
        .collect();
    Arc::new(move |binary: &[u8]| {
        let name = std::str::from_utf8(binary)
            .map_err(|_| VmError::UnknownVmType("binary is not a contract name".into()))?;
        table
            .get(name)
            .cloned()
            .ok_or_else(|| VmError::Aborted(format!("no native contract named {}", name)))
    })
}

/// The blob fields of a program of the native VM type running `contract`.
pub fn program_blob(contract: &str, description: &str) -> Params {
    let mut fields = Params::new();
    fields.set_raw(
        keys::BLOB_FIELD_VM_TYPE.as_bytes().to_vec(),
        NATIVE_VM_TYPE.as_bytes().to_vec(),
    );
    fields.set_raw(
        keys::BLOB_FIELD_PROGRAM_BINARY.as_bytes().to_vec(),
        contract.as_bytes().to_vec(),
    );
    fields.set_raw(
        keys::BLOB_FIELD_DESCRIPTION.as_bytes().to_vec(),
        description.as_bytes().to_vec(),
    );
    fields
}
