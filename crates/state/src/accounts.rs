// Path: crates/state/src/accounts.rs
//! Colored-balance bookkeeping in the accounts contract's key range.
//!
//! Three kinds of movement exist:
//! - [`credit`]: tokens entering the chain (request transfers, free tokens).
//!   Raises the agent's balance and the chain total.
//! - [`debit`]: tokens leaving the chain (outbound effects). Lowers both.
//! - [`transfer`]: tokens moving between two agents on the chain. Totals are
//!   unchanged.
//!
//! A debit or transfer never drives a balance negative; it checks every color
//! before touching any of them and fails with `InsufficientBalance`.
//!
//! All keys are local to the accounts contract. Callers outside the contract
//! pass a handle scoped to its namespace.

use chroma_api::state::{StateAccess, StateReader};
use chroma_types::app::{AgentId, Color, ColoredBalances};
use chroma_types::codec;
use chroma_types::error::{StateError, VmError};
use chroma_types::keys;

fn read_amount<S: StateReader + ?Sized>(state: &S, key: &[u8]) -> Result<u64, StateError> {
    match state.get(key)? {
        None => Ok(0),
        Some(bytes) => codec::from_bytes_canonical::<u64>(&bytes),
    }
}

fn write_amount<S: StateAccess + ?Sized>(
    state: &mut S,
    key: &[u8],
    amount: u64,
) -> Result<(), StateError> {
    if amount == 0 {
        state.delete(key)
    } else {
        state.insert(key, &codec::to_bytes_canonical(&amount))
    }
}

/// Scans `prefix` and decodes every entry as `(color, amount)`.
fn scan_colors<S: StateReader + ?Sized>(
    state: &S,
    prefix: &[u8],
) -> Result<ColoredBalances, StateError> {
    let mut out = ColoredBalances::new();
    for item in state.prefix_scan(prefix)? {
        let (key, value) = item?;
        let color = key
            .strip_prefix(prefix)
            .and_then(Color::from_slice)
            .ok_or_else(|| StateError::Decode("malformed balance key".into()))?;
        let amount = codec::from_bytes_canonical::<u64>(&value)?;
        out.checked_add(color, amount)
            .ok_or_else(|| StateError::InvalidValue("balance overflow".into()))?;
    }
    Ok(out)
}

/// The balance of one color held by `agent`.
pub fn balance_of<S: StateReader + ?Sized>(
    state: &S,
    agent: &AgentId,
    color: &Color,
) -> Result<u64, StateError> {
    read_amount(state, &keys::balance_key(agent, color))
}

/// All balances held by `agent`.
pub fn balances_of<S: StateReader + ?Sized>(
    state: &S,
    agent: &AgentId,
) -> Result<ColoredBalances, StateError> {
    scan_colors(state, &keys::agent_balance_prefix(agent))
}

/// The per-color total of all balances on the chain.
pub fn total_assets<S: StateReader + ?Sized>(state: &S) -> Result<ColoredBalances, StateError> {
    scan_colors(state, keys::TOTAL_ASSETS_PREFIX)
}

/// Every agent holding a non-zero balance.
pub fn accounts<S: StateReader + ?Sized>(state: &S) -> Result<Vec<AgentId>, StateError> {
    let prefix = keys::ACCOUNT_LIST_PREFIX;
    let mut out = Vec::new();
    for item in state.prefix_scan(prefix)? {
        let (key, _) = item?;
        let encoded = key
            .strip_prefix(prefix)
            .ok_or_else(|| StateError::Decode("malformed account key".into()))?;
        out.push(codec::from_bytes_canonical::<AgentId>(encoded)?);
    }
    Ok(out)
}

fn add_to_agent<S: StateAccess + ?Sized>(
    state: &mut S,
    agent: &AgentId,
    tokens: &ColoredBalances,
) -> Result<(), VmError> {
    if tokens.is_empty() {
        return Ok(());
    }
    for (color, amount) in tokens.iter() {
        let key = keys::balance_key(agent, color);
        let sum = read_amount(&*state, &key)?
            .checked_add(amount)
            .ok_or_else(|| StateError::Apply(format!("balance overflow for {}", agent)))?;
        write_amount(state, &key, sum)?;
    }
    state.insert(&keys::account_list_key(agent), &[1])?;
    Ok(())
}

fn ensure_covered<S: StateReader + ?Sized>(
    state: &S,
    agent: &AgentId,
    tokens: &ColoredBalances,
) -> Result<(), VmError> {
    for (color, needed) in tokens.iter() {
        let available = balance_of(state, agent, color)?;
        if available < needed {
            return Err(VmError::InsufficientBalance {
                agent: *agent,
                color: *color,
                needed,
                available,
            });
        }
    }
    Ok(())
}

fn sub_from_agent<S: StateAccess + ?Sized>(
    state: &mut S,
    agent: &AgentId,
    tokens: &ColoredBalances,
) -> Result<(), VmError> {
    if tokens.is_empty() {
        return Ok(());
    }
    ensure_covered(&*state, agent, tokens)?;
    for (color, amount) in tokens.iter() {
        let key = keys::balance_key(agent, color);
        let rest = read_amount(&*state, &key)?.saturating_sub(amount);
        write_amount(state, &key, rest)?;
    }
    if balances_of(&*state, agent)?.is_empty() {
        state.delete(&keys::account_list_key(agent))?;
    }
    Ok(())
}

fn adjust_totals<S: StateAccess + ?Sized>(
    state: &mut S,
    tokens: &ColoredBalances,
    increase: bool,
) -> Result<(), VmError> {
    for (color, amount) in tokens.iter() {
        let key = keys::total_assets_key(color);
        let current = read_amount(&*state, &key)?;
        let next = if increase {
            current.checked_add(amount)
        } else {
            current.checked_sub(amount)
        }
        .ok_or_else(|| StateError::Apply(format!("total assets out of range for {}", color)))?;
        write_amount(state, &key, next)?;
    }
    Ok(())
}

/// Credits tokens entering the chain to `agent`.
pub fn credit<S: StateAccess + ?Sized>(
    state: &mut S,
    agent: &AgentId,
    tokens: &ColoredBalances,
) -> Result<(), VmError> {
    add_to_agent(state, agent, tokens)?;
    adjust_totals(state, tokens, true)
}

/// Debits tokens leaving the chain from `agent`.
pub fn debit<S: StateAccess + ?Sized>(
    state: &mut S,
    agent: &AgentId,
    tokens: &ColoredBalances,
) -> Result<(), VmError> {
    sub_from_agent(state, agent, tokens)?;
    adjust_totals(state, tokens, false)
}

/// Moves tokens between two agents on the chain.
pub fn transfer<S: StateAccess + ?Sized>(
    state: &mut S,
    from: &AgentId,
    to: &AgentId,
    tokens: &ColoredBalances,
) -> Result<(), VmError> {
    if from == to {
        return ensure_covered(&*state, from, tokens);
    }
    sub_from_agent(state, from, tokens)?;
    add_to_agent(state, to, tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VirtualState;
    use chroma_api::state::StateOverlay;
    use chroma_types::app::{Address, ChainId, ContractId, Hname};
    use proptest::prelude::*;

    fn agent(n: u8) -> AgentId {
        AgentId::Address(Address([n; 32]))
    }

    fn red() -> Color {
        Color([0xAA; 32])
    }

    #[test]
    fn credit_and_debit_track_totals() {
        let base = VirtualState::new(ChainId([1; 32]), 4);
        let mut state = StateOverlay::new(&base);
        let alice = agent(1);

        credit(&mut state, &alice, &ColoredBalances::base(10).with(red(), 3)).unwrap();
        assert_eq!(balance_of(&state, &alice, &Color::BASE).unwrap(), 10);
        assert_eq!(total_assets(&state).unwrap(), ColoredBalances::base(10).with(red(), 3));

        debit(&mut state, &alice, &ColoredBalances::base(4)).unwrap();
        assert_eq!(balances_of(&state, &alice).unwrap(), ColoredBalances::base(6).with(red(), 3));
        assert_eq!(total_assets(&state).unwrap().get(&Color::BASE), 6);
    }

    #[test]
    fn failed_debit_changes_nothing() {
        let base = VirtualState::new(ChainId([1; 32]), 4);
        let mut state = StateOverlay::new(&base);
        let alice = agent(1);
        credit(&mut state, &alice, &ColoredBalances::base(5).with(red(), 1)).unwrap();

        let err = debit(&mut state, &alice, &ColoredBalances::base(1).with(red(), 2)).unwrap_err();
        assert!(matches!(
            err,
            VmError::InsufficientBalance { needed: 2, available: 1, .. }
        ));
        assert_eq!(balances_of(&state, &alice).unwrap(), ColoredBalances::base(5).with(red(), 1));
    }

    #[test]
    fn account_list_follows_non_zero_balances() {
        let base = VirtualState::new(ChainId([1; 32]), 4);
        let mut state = StateOverlay::new(&base);
        let contract = AgentId::Contract(ContractId::new(ChainId([1; 32]), Hname::of("c")));
        credit(&mut state, &agent(1), &ColoredBalances::base(2)).unwrap();
        transfer(&mut state, &agent(1), &contract, &ColoredBalances::base(2)).unwrap();

        assert_eq!(accounts(&state).unwrap(), vec![contract]);
        assert_eq!(balance_of(&state, &contract, &Color::BASE).unwrap(), 2);
    }

    #[test]
    fn self_transfer_only_checks_cover() {
        let base = VirtualState::new(ChainId([1; 32]), 4);
        let mut state = StateOverlay::new(&base);
        credit(&mut state, &agent(1), &ColoredBalances::base(2)).unwrap();
        transfer(&mut state, &agent(1), &agent(1), &ColoredBalances::base(2)).unwrap();
        assert!(transfer(&mut state, &agent(1), &agent(1), &ColoredBalances::base(3)).is_err());
        assert_eq!(balance_of(&state, &agent(1), &Color::BASE).unwrap(), 2);
    }

    proptest! {
        #[test]
        fn transfers_conserve_every_color(
            moves in prop::collection::vec((0u8..4, 0u8..4, 0u64..40, any::<bool>()), 1..40)
        ) {
            let base = VirtualState::new(ChainId([1; 32]), 4);
            let mut state = StateOverlay::new(&base);
            for n in 0..4 {
                credit(&mut state, &agent(n), &ColoredBalances::base(50).with(red(), 20)).unwrap();
            }
            let before = total_assets(&state).unwrap();

            for (from, to, amount, use_red) in moves {
                let color = if use_red { red() } else { Color::BASE };
                let _ = transfer(&mut state, &agent(from), &agent(to), &ColoredBalances::single(color, amount));
            }

            let mut sum = ColoredBalances::new();
            for a in accounts(&state).unwrap() {
                sum.checked_add_all(&balances_of(&state, &a).unwrap()).unwrap();
            }
            prop_assert_eq!(&sum, &before);
            prop_assert_eq!(total_assets(&state).unwrap(), before);
        }
    }
}
