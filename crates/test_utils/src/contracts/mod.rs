//! Contracts that exercise the sandbox from the inside

mod native;

pub use native::{native_vm, program_blob, NATIVE_VM_TYPE};

use chroma_api::state::{StateAccess, StateReader};
use chroma_api::vm::{ContractInterface, Sandbox, SandboxView};
use chroma_types::app::{
    Address, AgentId, ChainId, Color, ColoredBalances, Hname, Params, RequestSection,
};
use chroma_types::error::VmError;

/// Name the sandbox test contract is usually deployed under
pub const SANDBOX_TEST: &str = "sandboxtest";

pub const PARAM_INT_VALUE: &str = "intValue";
pub const PARAM_NAME: &str = "name";
pub const PARAM_CONTRACT: &str = "hnameContract";
pub const PARAM_ENTRY_POINT: &str = "hnameEP";
pub const PARAM_AGENT_ID: &str = "agentID";
pub const PARAM_ADDRESS: &str = "address";
pub const PARAM_CHAIN_ID: &str = "chainID";
pub const PARAM_COLOR: &str = "color";
pub const PARAM_AMOUNT: &str = "amount";
pub const PARAM_TRANSFER: &str = "transfer";
pub const PARAM_FAIL: &str = "fail";
pub const PARAM_OK: &str = "ok";
pub const PARAM_ENTROPY: &str = "entropy";
pub const PARAM_DEPTH: &str = "depth";

fn int_key(name: &str) -> Vec<u8> {
    [b"int/".as_slice(), name.as_bytes()].concat()
}

fn read_int(state: &dyn StateReader, name: &str) -> Result<i64, VmError> {
    match state.get(&int_key(name))? {
        None => Ok(0),
        Some(bytes) => <[u8; 8]>::try_from(bytes.as_slice())
            .map(i64::from_le_bytes)
            .map_err(|_| VmError::InvalidParameterEncoding(name.to_string())),
    }
}

/// The expected result of `getFibonacci(n)`.
pub fn fibonacci(n: i64) -> i64 {
    if n <= 1 {
        return n;
    }
    let (mut a, mut b) = (0i64, 1i64);
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    b
}

/// A contract with one entry point per sandbox behaviour worth testing.
pub fn sandbox_test_contract() -> ContractInterface {
    ContractInterface::new(SANDBOX_TEST, "Sandbox test contract")
        .func("init", init)
        .func("setInt", set_int)
        .func("writeThenFail", write_then_fail)
        .func("callAndRecover", call_and_recover)
        .func("callOnChain", call_on_chain)
        .func("recurse", recurse)
        .func("testAbort", |_ctx: &mut dyn Sandbox| {
            Err(VmError::Aborted("aborted by contract".into()))
        })
        .func("testPanic", test_panic)
        .func("moveTokens", move_tokens)
        .func("sendToAddress", send_to_address)
        .func("sendCrossChain", send_cross_chain)
        .func("postToSelf", post_to_self)
        .func("getEntropy", |ctx: &mut dyn Sandbox| {
            Ok(Params::new().with(PARAM_ENTROPY, ctx.entropy()))
        })
        .view("getInt", get_int)
        .view("getFibonacci", get_fibonacci)
        .view("getBalances", |ctx: &mut dyn SandboxView| {
            Ok(ctx
                .balances()?
                .iter()
                .map(|(color, amount)| (color.0.to_vec(), amount.to_le_bytes().to_vec()))
                .collect())
        })
        .view("viewCallsFull", view_calls_full)
}

fn init(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    if ctx.params().get_or(PARAM_FAIL, false)? {
        return Err(VmError::Aborted("init failed on request".into()));
    }
    ctx.state().insert(b"initialized", &[1])?;
    Ok(Params::new())
}

fn set_int(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let name: String = ctx.params().require(PARAM_NAME)?;
    let value: i64 = ctx.params().require(PARAM_INT_VALUE)?;
    ctx.state().insert(&int_key(&name), &value.to_le_bytes())?;
    ctx.event(&format!("{} = {}", name, value));
    Ok(Params::new())
}

fn get_int(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    let name: String = ctx.params().require(PARAM_NAME)?;
    let value = read_int(&ctx.state(), &name)?;
    Ok(Params::new().with(&name, value))
}

#[allow(clippy::panic)]
fn test_panic(_ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    panic!("contract panicked on purpose")
}

fn write_then_fail(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    ctx.state().insert(&int_key("inner"), &1i64.to_le_bytes())?;
    Err(VmError::Aborted("failing after a write".into()))
}

/// Writes `outer`, then calls `writeThenFail` on `hnameContract` (itself by
/// default) with `transfer` attached and swallows the error.
fn call_and_recover(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    ctx.state().insert(&int_key("outer"), &1i64.to_le_bytes())?;
    let this = ctx.contract_id().hname;
    let target: Hname = ctx.params().get_or(PARAM_CONTRACT, this)?;
    let amount: u64 = ctx.params().get_or(PARAM_TRANSFER, 0)?;
    let nested = ctx.call(
        target,
        Hname::of("writeThenFail"),
        Params::new(),
        ColoredBalances::base(amount),
    );
    Ok(Params::new().with(PARAM_OK, nested.is_ok()))
}

/// Forwards the remaining params to `hnameContract.hnameEP`, attaching
/// `transfer` base tokens.
fn call_on_chain(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let mut params = ctx.params().clone();
    let contract: Hname = params.require(PARAM_CONTRACT)?;
    let entry_point: Hname = params.require(PARAM_ENTRY_POINT)?;
    let amount: u64 = params.get_or(PARAM_TRANSFER, 0)?;
    params.remove(PARAM_CONTRACT);
    params.remove(PARAM_ENTRY_POINT);
    params.remove(PARAM_TRANSFER);
    ctx.call(contract, entry_point, params, ColoredBalances::base(amount))
}

/// Calls itself `intValue` times through full calls and returns the depth reached.
fn recurse(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let n: i64 = ctx.params().require(PARAM_INT_VALUE)?;
    if n <= 0 {
        return Ok(Params::new().with(PARAM_DEPTH, 1i64));
    }
    let this = ctx.contract_id().hname;
    let inner = ctx.call(
        this,
        Hname::of("recurse"),
        Params::new().with(PARAM_INT_VALUE, n - 1),
        ColoredBalances::new(),
    )?;
    let depth: i64 = inner.require(PARAM_DEPTH)?;
    Ok(Params::new().with(PARAM_DEPTH, depth + 1))
}

fn get_fibonacci(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    let n: i64 = ctx.params().require(PARAM_INT_VALUE)?;
    if n <= 1 {
        return Ok(Params::new().with(PARAM_INT_VALUE, n));
    }
    let this = ctx.contract_id().hname;
    let ep = Hname::of("getFibonacci");
    let a: i64 = ctx
        .call(this, ep, Params::new().with(PARAM_INT_VALUE, n - 1))?
        .require(PARAM_INT_VALUE)?;
    let b: i64 = ctx
        .call(this, ep, Params::new().with(PARAM_INT_VALUE, n - 2))?
        .require(PARAM_INT_VALUE)?;
    Ok(Params::new().with(PARAM_INT_VALUE, a + b))
}

fn view_calls_full(ctx: &mut dyn SandboxView) -> Result<Params, VmError> {
    let this = ctx.contract_id().hname;
    ctx.call(
        this,
        Hname::of("setInt"),
        Params::new()
            .with(PARAM_NAME, "x".to_string())
            .with(PARAM_INT_VALUE, 1i64),
    )
}

fn move_tokens(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let target: AgentId = ctx.params().require(PARAM_AGENT_ID)?;
    let color: Color = ctx.params().get_or(PARAM_COLOR, Color::BASE)?;
    let amount: u64 = ctx.params().require(PARAM_AMOUNT)?;
    let ok = ctx.move_tokens(&target, &color, amount);
    Ok(Params::new().with(PARAM_OK, ok))
}

fn send_to_address(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let address: Address = ctx.params().require(PARAM_ADDRESS)?;
    let amount: u64 = ctx.params().require(PARAM_AMOUNT)?;
    let ok = ctx.transfer_to_address(&address, &ColoredBalances::base(amount));
    Ok(Params::new().with(PARAM_OK, ok))
}

fn send_cross_chain(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let target: AgentId = ctx.params().require(PARAM_AGENT_ID)?;
    let chain: ChainId = ctx.params().require(PARAM_CHAIN_ID)?;
    let amount: u64 = ctx.params().require(PARAM_AMOUNT)?;
    let ok = ctx.transfer_cross_chain(&target, &chain, &ColoredBalances::base(amount));
    Ok(Params::new().with(PARAM_OK, ok))
}

/// Posts a time-locked `setInt` request back to this contract.
fn post_to_self(ctx: &mut dyn Sandbox) -> Result<Params, VmError> {
    let value: i64 = ctx.params().require(PARAM_INT_VALUE)?;
    let time_lock: u64 = ctx.params().get_or("timeLock", 0)?;
    let section = RequestSection::new(ctx.contract_id(), Hname::of("setInt"))
        .with_params(
            Params::new()
                .with(PARAM_NAME, "posted".to_string())
                .with(PARAM_INT_VALUE, value),
        )
        .with_time_lock(time_lock);
    let ok = ctx.post_request(section);
    Ok(Params::new().with(PARAM_OK, ok))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_fibonacci() {
        let expected = [0, 1, 1, 2, 3, 5, 8, 13, 21];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(fibonacci(n as i64), *want);
        }
    }
}
