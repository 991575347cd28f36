// Path: crates/execution/src/core_contracts/root.rs
//! The root contract.
//!
//! Keeps the `ChainInfo` record, the contract registry and the deploy
//! permission list. All helpers take state scoped to the root namespace.

use chroma_api::state::{StateAccess, StateReader};
use chroma_api::vm::{ContractInterface, Sandbox, SandboxView};
use chroma_types::app::{AgentId, ChainInfo, ContractRecord, HashValue, Hname, Params};
use chroma_types::codec;
use chroma_types::error::{StateError, VmError};
use chroma_types::keys;

pub const FUNC_DEPLOY_CONTRACT: &str = "deployContract";
pub const FUNC_GRANT_DEPLOY_PERMISSION: &str = "grantDeployPermission";
pub const FUNC_REVOKE_DEPLOY_PERMISSION: &str = "revokeDeployPermission";
pub const FUNC_SET_CONTRACT_FEE: &str = "setContractFee";
pub const FUNC_DELEGATE_CHAIN_OWNERSHIP: &str = "delegateChainOwnership";
pub const FUNC_CLAIM_CHAIN_OWNERSHIP: &str = "claimChainOwnership";
pub const VIEW_FIND_CONTRACT: &str = "findContract";
pub const VIEW_GET_CHAIN_INFO: &str = "getChainInfo";
pub const VIEW_GET_FEE_INFO: &str = "getFeeInfo";

pub const PARAM_PROGRAM_HASH: &str = "programHash";
pub const PARAM_NAME: &str = "name";
pub const PARAM_DESCRIPTION: &str = "description";
pub const PARAM_DEPLOYER: &str = "deployer";
pub const PARAM_HNAME: &str = "hname";
pub const PARAM_OWNER_FEE: &str = "ownerFee";
pub const PARAM_VALIDATOR_FEE: &str = "validatorFee";
pub const PARAM_CHAIN_OWNER: &str = "chainOwner";
pub const PARAM_RECORD: &str = "record";
pub const PARAM_CHAIN_ID: &str = "chainID";
pub const PARAM_FEE_COLOR: &str = "feeColor";
pub const PARAM_VALIDATOR_FEE_TARGET: &str = "validatorFeeTarget";

pub fn interface() -> ContractInterface {
    ContractInterface::new(keys::ROOT_CONTRACT, "Chain registry and governance")
        .func(FUNC_DEPLOY_CONTRACT, deploy_contract)
        .func(FUNC_GRANT_DEPLOY_PERMISSION, grant_deploy_permission)
        .func(FUNC_REVOKE_DEPLOY_PERMISSION, revoke_deploy_permission)
        .func(FUNC_SET_CONTRACT_FEE, set_contract_fee)
        .func(FUNC_DELEGATE_CHAIN_OWNERSHIP, delegate_chain_ownership)
        .func(FUNC_CLAIM_CHAIN_OWNERSHIP, claim_chain_ownership)
        .view(VIEW_FIND_CONTRACT, view_find_contract)
        .view(VIEW_GET_CHAIN_INFO, view_get_chain_info)
        .view(VIEW_GET_FEE_INFO, view_get_fee_info)
}

// --- state helpers ---

pub fn chain_info<S: StateReader + ?Sized>(state: &S) -> Result<Option<ChainInfo>, StateError> {
    state
        .get(keys::CHAIN_INFO_KEY)?
        .map(|bytes| codec::from_bytes_canonical(&bytes))
        .transpose()
}

pub fn store_chain_info<S: StateAccess + ?Sized>(
    state: &mut S,
    info: &ChainInfo,
) -> Result<(), StateError> {
    state.insert(keys::CHAIN_INFO_KEY, &codec::to_bytes_canonical(info))
}

pub fn find_contract<S: StateReader + ?Sized>(
    state: &S,
    hname: Hname,
) -> Result<Option<ContractRecord>, StateError> {
    state
        .get(&keys::contract_record_key(hname))?
        .map(|bytes| codec::from_bytes_canonical(&bytes))
        .transpose()
}

pub fn store_contract<S: StateAccess + ?Sized>(
    state: &mut S,
    hname: Hname,
    record: &ContractRecord,
) -> Result<(), StateError> {
    state.insert(
        &keys::contract_record_key(hname),
        &codec::to_bytes_canonical(record),
    )
}

pub fn has_deploy_permission<S: StateReader + ?Sized>(
    state: &S,
    agent: &AgentId,
) -> Result<bool, StateError> {
    state.has(&keys::deploy_permission_key(agent))
}

fn require_chain_info<S: StateReader + ?Sized>(state: &S) -> Result<ChainInfo, VmError> {
    chain_info(state)?
        .ok_or_else(|| StateError::Validation("chain info is missing".into()).into())
}

fn ensure_chain_owner(ctx: &dyn Sandbox) -> Result<(), VmError> {
    if ctx.caller() != ctx.chain_owner_id() {
        return Err(VmError::PermissionDenied(format!(
            "{} is not the chain owner",
            ctx.caller()
        )));
    }
    Ok(())
}

// --- entry points ---

fn deploy_contract(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let mut init_params = ctx.params().clone();
    let program_hash: HashValue = init_params.require(PARAM_PROGRAM_HASH)?;
    let name: String = init_params.require(PARAM_NAME)?;
    let description: String = init_params.get_or(PARAM_DESCRIPTION, String::new())?;
    for key in [PARAM_PROGRAM_HASH, PARAM_NAME, PARAM_DESCRIPTION] {
        init_params.remove(key);
    }

    ctx.deploy_contract(program_hash, &name, &description, init_params)?;
    Ok(Params::new().with(PARAM_HNAME, Hname::of(&name)))
}

fn grant_deploy_permission(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    ensure_chain_owner(&*ctx)?;
    let deployer: AgentId = ctx.params().require(PARAM_DEPLOYER)?;
    ctx.state()
        .insert(&keys::deploy_permission_key(&deployer), &[1])?;
    ctx.event(&format!("deploy permission granted to {}", deployer));
    Ok(Params::new())
}

fn revoke_deploy_permission(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    ensure_chain_owner(&*ctx)?;
    let deployer: AgentId = ctx.params().require(PARAM_DEPLOYER)?;
    ctx.state().delete(&keys::deploy_permission_key(&deployer))?;
    ctx.event(&format!("deploy permission revoked from {}", deployer));
    Ok(Params::new())
}

fn set_contract_fee(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    ensure_chain_owner(&*ctx)?;
    let params = ctx.params();
    let hname: Hname = params.require(PARAM_HNAME)?;
    let owner_fee: Option<u64> = params.get(PARAM_OWNER_FEE)?;
    let validator_fee: Option<u64> = params.get(PARAM_VALIDATOR_FEE)?;
    if owner_fee.is_none() && validator_fee.is_none() {
        return Err(VmError::MissingParameter(PARAM_OWNER_FEE.into()));
    }

    let mut state = ctx.state();
    let mut record = find_contract(&state, hname)?
        .ok_or_else(|| VmError::UnknownContract(hname.to_string()))?;
    if let Some(fee) = owner_fee {
        record.owner_fee = fee;
    }
    if let Some(fee) = validator_fee {
        record.validator_fee = fee;
    }
    store_contract(&mut state, hname, &record)?;
    Ok(Params::new())
}

fn delegate_chain_ownership(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    ensure_chain_owner(&*ctx)?;
    let next: AgentId = ctx.params().require(PARAM_CHAIN_OWNER)?;
    let mut state = ctx.state();
    let mut info = require_chain_info(&state)?;
    info.pending_owner = Some(next);
    store_chain_info(&mut state, &info)?;
    Ok(Params::new())
}

fn claim_chain_ownership(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let caller = ctx.caller();
    let mut state = ctx.state();
    let mut info = require_chain_info(&state)?;
    if info.pending_owner != Some(caller) {
        return Err(VmError::PermissionDenied(format!(
            "{} is not the delegated chain owner",
            caller
        )));
    }
    info.owner = caller;
    info.pending_owner = None;
    store_chain_info(&mut state, &info)?;
    drop(state);
    ctx.event(&format!("chain ownership claimed by {}", caller));
    Ok(Params::new())
}

// --- views ---

fn view_find_contract(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    let hname: Hname = ctx.params().require(PARAM_HNAME)?;
    let record = find_contract(&ctx.state(), hname)?
        .ok_or_else(|| VmError::UnknownContract(hname.to_string()))?;
    Ok(Params::new().with(PARAM_RECORD, codec::to_bytes_canonical(&record)))
}

fn view_get_chain_info(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    let info = require_chain_info(&ctx.state())?;
    Ok(Params::new()
        .with(PARAM_CHAIN_ID, info.chain_id)
        .with(PARAM_CHAIN_OWNER, info.owner)
        .with(PARAM_DESCRIPTION, info.description)
        .with(PARAM_FEE_COLOR, info.fee_color)
        .with(PARAM_VALIDATOR_FEE_TARGET, info.validator_fee_target))
}

fn view_get_fee_info(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    let hname: Hname = ctx.params().require(PARAM_HNAME)?;
    let state = ctx.state();
    let info = require_chain_info(&state)?;
    let record = find_contract(&state, hname)?
        .ok_or_else(|| VmError::UnknownContract(hname.to_string()))?;
    Ok(Params::new()
        .with(PARAM_FEE_COLOR, info.fee_color)
        .with(PARAM_OWNER_FEE, record.owner_fee)
        .with(PARAM_VALIDATOR_FEE, record.validator_fee))
}
