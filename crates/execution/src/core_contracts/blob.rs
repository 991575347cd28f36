// Path: crates/execution/src/core_contracts/blob.rs
//! The blob contract: content-addressed field sets.
//!
//! A blob is a `Params` mapping stored under the hash of its canonical
//! encoding. Programs are blobs with a `v` (VM type) and a `p` (binary) field.

use chroma_api::state::{StateAccess, StateReader};
use chroma_api::vm::{ContractInterface, Sandbox, SandboxView};
use chroma_types::app::{HashValue, Params};
use chroma_types::codec;
use chroma_types::error::{StateError, VmError};
use chroma_types::keys;

pub const FUNC_STORE_BLOB: &str = "storeBlob";
pub const VIEW_GET_BLOB_INFO: &str = "getBlobInfo";
pub const VIEW_GET_BLOB_FIELD: &str = "getBlobField";

pub const PARAM_HASH: &str = "hash";
pub const PARAM_FIELD: &str = "field";
pub const PARAM_BYTES: &str = "bytes";

pub fn interface() -> ContractInterface {
    ContractInterface::new(keys::BLOB_CONTRACT, "Content-addressed blob storage")
        .func(FUNC_STORE_BLOB, store_blob)
        .view(VIEW_GET_BLOB_INFO, view_get_blob_info)
        .view(VIEW_GET_BLOB_FIELD, view_get_blob_field)
}

/// The hash a set of fields is stored under.
pub fn blob_hash(fields: &Params) -> HashValue {
    HashValue::digest(&[&codec::to_bytes_canonical(fields)])
}

/// Reads one field of a stored blob.
pub fn get_field<S: StateReader + ?Sized>(
    state: &S,
    hash: &HashValue,
    field: &str,
) -> Result<Option<Vec<u8>>, StateError> {
    state.get(&keys::blob_field_key(hash, field.as_bytes()))
}

/// The field-size table of a stored blob.
pub fn blob_info<S: StateReader + ?Sized>(
    state: &S,
    hash: &HashValue,
) -> Result<Option<Vec<(Vec<u8>, u32)>>, StateError> {
    state
        .get(&keys::blob_info_key(hash))?
        .map(|bytes| codec::from_bytes_canonical(&bytes))
        .transpose()
}

/// Stores `fields` and returns their hash. Storing the same fields twice is
/// a no-op.
pub fn put_blob<S: StateAccess + ?Sized>(
    state: &mut S,
    fields: &Params,
) -> Result<HashValue, StateError> {
    let hash = blob_hash(fields);
    if state.has(&keys::blob_info_key(&hash))? {
        return Ok(hash);
    }
    let mut sizes = Vec::with_capacity(fields.len());
    for (field, value) in fields.iter() {
        state.insert(&keys::blob_field_key(&hash, field), value)?;
        let size = u32::try_from(value.len())
            .map_err(|_| StateError::InvalidValue("blob field too large".into()))?;
        sizes.push((field.to_vec(), size));
    }
    state.insert(&keys::blob_info_key(&hash), &codec::to_bytes_canonical(&sizes))?;
    Ok(hash)
}

fn store_blob(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let fields = ctx.params().clone();
    if fields.is_empty() {
        return Err(VmError::MissingParameter("blob fields".into()));
    }
    let hash = put_blob(&mut ctx.state(), &fields)?;
    ctx.event(&format!("blob stored: {} ({} fields)", hash, fields.len()));
    Ok(Params::new().with(PARAM_HASH, hash))
}

fn view_get_blob_info(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    let hash: HashValue = ctx.params().require(PARAM_HASH)?;
    let sizes = blob_info(&ctx.state(), &hash)?
        .ok_or_else(|| VmError::Aborted(format!("blob {} not found", hash)))?;
    Ok(sizes
        .into_iter()
        .map(|(field, size)| (field, u64::from(size).to_le_bytes().to_vec()))
        .collect())
}

fn view_get_blob_field(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    let hash: HashValue = ctx.params().require(PARAM_HASH)?;
    let field: String = ctx.params().require(PARAM_FIELD)?;
    let bytes = get_field(&ctx.state(), &hash, &field)?
        .ok_or_else(|| VmError::Aborted(format!("field {} of blob {} not found", field, hash)))?;
    Ok(Params::new().with(PARAM_BYTES, bytes))
}
