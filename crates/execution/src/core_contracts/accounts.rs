// Path: crates/execution/src/core_contracts/accounts.rs
//! The accounts contract: the on-chain face of the balance ledger.

use chroma_api::vm::{ContractInterface, Sandbox, SandboxView};
use chroma_state::accounts as ledger;
use chroma_types::app::{AgentId, Color, ColoredBalances, Params};
use chroma_types::codec;
use chroma_types::error::VmError;
use chroma_types::keys;

pub const FUNC_DEPOSIT: &str = "deposit";
pub const FUNC_WITHDRAW: &str = "withdraw";
pub const VIEW_GET_BALANCE: &str = "getBalance";
pub const VIEW_GET_ACCOUNTS: &str = "getAccounts";
pub const VIEW_TOTAL_ASSETS: &str = "totalAssets";

pub const PARAM_AGENT_ID: &str = "agentID";

pub fn interface() -> ContractInterface {
    ContractInterface::new(keys::ACCOUNTS_CONTRACT, "Chain account ledger")
        .func(FUNC_DEPOSIT, deposit)
        .func(FUNC_WITHDRAW, withdraw)
        .view(VIEW_GET_BALANCE, view_get_balance)
        .view(VIEW_GET_ACCOUNTS, view_get_accounts)
        .view(VIEW_TOTAL_ASSETS, view_total_assets)
}

/// Encodes balances as a mapping from color bytes to 8-byte LE amounts.
pub fn balances_to_params(balances: &ColoredBalances) -> Params {
    balances
        .iter()
        .map(|(color, amount)| (color.0.to_vec(), amount.to_le_bytes().to_vec()))
        .collect()
}

/// Inverse of [`balances_to_params`].
pub fn params_to_balances(params: &Params) -> Result<ColoredBalances, VmError> {
    let mut out = ColoredBalances::new();
    for (key, value) in params.iter() {
        let color = Color::from_slice(key)
            .ok_or_else(|| VmError::InvalidParameterEncoding(hex::encode(key)))?;
        let amount = <[u8; 8]>::try_from(value)
            .map(u64::from_le_bytes)
            .map_err(|_| VmError::InvalidParameterEncoding(hex::encode(key)))?;
        out.checked_add(color, amount)
            .ok_or_else(|| VmError::InvalidParameterEncoding(hex::encode(key)))?;
    }
    Ok(out)
}

fn privileged_move(
    ctx: &mut dyn Sandbox,
    from: &AgentId,
    to: &AgentId,
    transfer: &ColoredBalances,
) -> Result<(), VmError> {
    ctx.privileged()
        .ok_or_else(|| VmError::PermissionDenied("privileged sandbox unavailable".into()))?
        .move_balance(from, to, transfer)
}

/// Credits the incoming transfer to `agentID`, or to the caller.
fn deposit(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let target: AgentId = ctx.params().get_or(PARAM_AGENT_ID, ctx.caller())?;
    let incoming = ctx.incoming_transfer().clone();
    let this = AgentId::Contract(ctx.contract_id());
    if incoming.is_empty() || target == this {
        return Ok(Params::new());
    }
    privileged_move(ctx, &this, &target, &incoming)?;
    ctx.log().debug(&format!("deposited to {}", target));
    Ok(Params::new())
}

/// Sends the caller's whole on-chain balance back to its ledger address.
fn withdraw(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let caller = ctx.caller();
    let address = *caller.address().ok_or_else(|| {
        VmError::PermissionDenied("only ledger addresses can withdraw".into())
    })?;
    let this = AgentId::Contract(ctx.contract_id());

    let owned = ledger::balances_of(&ctx.state(), &caller)?;
    privileged_move(ctx, &caller, &this, &owned)?;

    let mut outgoing = owned;
    outgoing
        .checked_add_all(ctx.incoming_transfer())
        .ok_or_else(|| VmError::Aborted("withdrawal amount overflows".into()))?;
    if outgoing.is_empty() {
        return Ok(Params::new());
    }
    if !ctx.transfer_to_address(&address, &outgoing) {
        return Err(VmError::Aborted("withdrawal could not be staged".into()));
    }
    ctx.event(&format!("withdrawal to {}", address));
    Ok(Params::new())
}

fn view_get_balance(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    let agent: AgentId = ctx.params().require(PARAM_AGENT_ID)?;
    let balances = ledger::balances_of(&ctx.state(), &agent)?;
    Ok(balances_to_params(&balances))
}

fn view_get_accounts(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    Ok(ledger::accounts(&ctx.state())?
        .into_iter()
        .map(|agent| (codec::to_bytes_canonical(&agent), vec![1]))
        .collect())
}

fn view_total_assets(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    Ok(balances_to_params(&ledger::total_assets(&ctx.state())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balances_params_conversion_is_lossless() {
        let balances = ColoredBalances::base(7).with(Color([3; 32]), 11);
        assert_eq!(
            params_to_balances(&balances_to_params(&balances)).unwrap(),
            balances
        );
    }

    #[test]
    fn malformed_amounts_are_rejected() {
        let mut params = Params::new();
        params.set_raw(Color::BASE.0.to_vec(), vec![1, 2]);
        assert!(matches!(
            params_to_balances(&params),
            Err(VmError::InvalidParameterEncoding(_))
        ));
    }
}
