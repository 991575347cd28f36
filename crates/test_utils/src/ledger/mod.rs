//! An in-memory ledger implementing `Level1Client`

use async_trait::async_trait;
use chroma_api::ledger::Level1Client;
use chroma_types::app::{
    Address, AgentId, BlockHeader, ChainId, Color, ColoredBalances, HashValue, OutboundEffect,
    RequestId, RequestRef, RequestSection, TxId,
};
use chroma_types::error::LedgerError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::mpsc;

#[derive(Default)]
struct LedgerInner {
    balances: BTreeMap<(Address, Color), u64>,
    subscribers: HashMap<ChainId, mpsc::Sender<RequestRef>>,
    anchors: HashMap<ChainId, Vec<BlockHeader>>,
    undelivered: Vec<RequestRef>,
    closed: HashSet<ChainId>,
    tx_counter: u64,
    reject_state_transitions: usize,
}

impl LedgerInner {
    fn next_tx_id(&mut self) -> TxId {
        self.tx_counter += 1;
        TxId(HashValue::digest(&[b"ledger/tx", &self.tx_counter.to_be_bytes()]).0)
    }

    fn credit(&mut self, address: &Address, tokens: &ColoredBalances) {
        for (color, amount) in tokens.iter() {
            let entry = self.balances.entry((*address, *color)).or_default();
            *entry = entry.saturating_add(amount);
        }
    }

    fn debit(&mut self, address: &Address, tokens: &ColoredBalances) -> Result<(), LedgerError> {
        for (color, amount) in tokens.iter() {
            let held = self.balances.get(&(*address, *color)).copied().unwrap_or(0);
            if held < amount {
                return Err(LedgerError::InsufficientFunds(format!(
                    "{} holds {} of {}, needs {}",
                    address, held, color, amount
                )));
            }
        }
        for (color, amount) in tokens.iter() {
            if let Some(held) = self.balances.get_mut(&(*address, *color)) {
                *held -= amount;
            }
        }
        Ok(())
    }

    fn ensure_open(&self, chain: &ChainId) -> Result<(), LedgerError> {
        if self.closed.contains(chain) {
            return Err(LedgerError::Rejected(format!("chain {} is closed", chain)));
        }
        Ok(())
    }
}

/// A single-process ledger.
///
/// Request transactions are confirmed immediately and their requests pushed
/// to the subscribed chain. State transitions credit `TransferToAddress`
/// effects and deliver `PostRequest` effects to the target chain's feed.
/// A transition is validated as a whole before any of it takes effect.
#[derive(Default)]
pub struct InMemoryLedger {
    inner: Mutex<LedgerInner>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints tokens to `address`.
    pub fn faucet(&self, address: &Address, tokens: &ColoredBalances) {
        self.inner.lock().credit(address, tokens);
    }

    /// Anchored headers of `chain`, oldest first.
    pub fn anchors(&self, chain: &ChainId) -> Vec<BlockHeader> {
        self.inner
            .lock()
            .anchors
            .get(chain)
            .cloned()
            .unwrap_or_default()
    }

    /// Requests addressed to chains nobody subscribed to.
    pub fn undelivered(&self) -> Vec<RequestRef> {
        self.inner.lock().undelivered.clone()
    }

    /// Closes `chain`: request transactions to it, and state transitions
    /// posting requests to it, are rejected from now on.
    pub fn close_chain(&self, chain: &ChainId) {
        self.inner.lock().closed.insert(*chain);
    }

    /// Makes the next `count` state transitions fail with `Rejected`.
    pub fn reject_next_state_transitions(&self, count: usize) {
        self.inner.lock().reject_state_transitions = count;
    }

    /// Pushes requests to their target chains' feeds. Requests whose chain
    /// has no live feed are kept in [`undelivered`](Self::undelivered).
    async fn deliver(&self, requests: Vec<RequestRef>) {
        for request in requests {
            let chain = request.target.chain_id;
            let feed = self.inner.lock().subscribers.get(&chain).cloned();
            let unsent = match feed {
                Some(feed) => feed.send(request).await.err().map(|e| e.0),
                None => Some(request),
            };
            if let Some(request) = unsent {
                tracing::debug!(
                    target: "ledger",
                    event = "request_undelivered",
                    chain = %chain,
                    request = %request.id,
                );
                self.inner.lock().undelivered.push(request);
            }
        }
    }
}

fn section_index(index: usize) -> Result<u16, LedgerError> {
    u16::try_from(index).map_err(|_| LedgerError::Rejected("too many sections".into()))
}

#[async_trait]
impl Level1Client for InMemoryLedger {
    async fn post_request_transaction(
        &self,
        sender: &Address,
        chain: &ChainId,
        sections: Vec<RequestSection>,
    ) -> Result<TxId, LedgerError> {
        let (tx_id, requests) = {
            let mut inner = self.inner.lock();
            if !inner.subscribers.contains_key(chain) {
                return Err(LedgerError::UnknownChain(*chain));
            }
            inner.ensure_open(chain)?;
            if sections.len() > usize::from(u16::MAX) + 1 {
                return Err(LedgerError::Rejected("too many sections".into()));
            }
            let mut total = ColoredBalances::new();
            for section in &sections {
                if section.target.chain_id != *chain {
                    return Err(LedgerError::Rejected("section targets another chain".into()));
                }
                total
                    .checked_add_all(&section.transfer)
                    .ok_or_else(|| LedgerError::Rejected("transfer overflow".into()))?;
            }
            inner.debit(sender, &total)?;

            let tx_id = inner.next_tx_id();
            let mut requests = Vec::with_capacity(sections.len());
            for (index, section) in sections.into_iter().enumerate() {
                let id = RequestId::new(tx_id, section_index(index)?);
                requests.push(section.into_request(id, AgentId::Address(*sender)));
            }
            (tx_id, requests)
        };
        self.deliver(requests).await;
        Ok(tx_id)
    }

    async fn post_state_transition(
        &self,
        chain: &ChainId,
        header: &BlockHeader,
        outbound: Vec<OutboundEffect>,
    ) -> Result<TxId, LedgerError> {
        let (tx_id, requests) = {
            let mut inner = self.inner.lock();
            if inner.reject_state_transitions > 0 {
                inner.reject_state_transitions -= 1;
                return Err(LedgerError::Rejected("state transition rejected".into()));
            }
            for effect in &outbound {
                if let OutboundEffect::PostRequest { section, .. } = effect {
                    inner.ensure_open(&section.target.chain_id)?;
                }
            }
            if outbound.len() > usize::from(u16::MAX) + 1 {
                return Err(LedgerError::Rejected("too many sections".into()));
            }
            let tx_id = inner.next_tx_id();
            let mut requests = Vec::new();
            for effect in outbound {
                match effect {
                    OutboundEffect::TransferToAddress {
                        address, transfer, ..
                    } => inner.credit(&address, &transfer),
                    OutboundEffect::PostRequest { sender, section } => {
                        let id = RequestId::new(tx_id, section_index(requests.len())?);
                        requests.push(section.into_request(id, sender));
                    }
                }
            }
            inner
                .anchors
                .entry(*chain)
                .or_default()
                .push(header.clone());
            (tx_id, requests)
        };
        self.deliver(requests).await;
        Ok(tx_id)
    }

    async fn balance(&self, address: &Address, color: &Color) -> Result<u64, LedgerError> {
        Ok(self
            .inner
            .lock()
            .balances
            .get(&(*address, *color))
            .copied()
            .unwrap_or(0))
    }

    async fn subscribe(
        &self,
        chain: &ChainId,
        capacity: usize,
    ) -> Result<mpsc::Receiver<RequestRef>, LedgerError> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.inner.lock().subscribers.insert(*chain, tx);
        tracing::debug!(target: "ledger", event = "subscribed", chain = %chain);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{address, agent, chain_id};
    use chroma_types::app::{ContractId, Hname};

    #[tokio::test]
    async fn request_transactions_debit_sender_and_reach_subscriber() {
        let ledger = InMemoryLedger::new();
        let chain = chain_id(1);
        let mut feed = ledger.subscribe(&chain, 4).await.unwrap();
        ledger.faucet(&address(1), &ColoredBalances::base(10));

        let section = RequestSection::new(ContractId::new(chain, Hname::of("c")), Hname::of("f"))
            .with_transfer(ColoredBalances::base(4));
        let tx_id = ledger
            .post_request_transaction(&address(1), &chain, vec![section])
            .await
            .unwrap();

        let request = feed.recv().await.unwrap();
        assert_eq!(request.id, RequestId::new(tx_id, 0));
        assert_eq!(ledger.balance(&address(1), &Color::BASE).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn underfunded_transaction_is_rejected_without_debit() {
        let ledger = InMemoryLedger::new();
        let chain = chain_id(1);
        let _feed = ledger.subscribe(&chain, 4).await.unwrap();
        ledger.faucet(&address(1), &ColoredBalances::base(1));

        let section = RequestSection::new(ContractId::new(chain, Hname::of("c")), Hname::of("f"))
            .with_transfer(ColoredBalances::base(4));
        let err = ledger
            .post_request_transaction(&address(1), &chain, vec![section])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds(_)));
        assert_eq!(ledger.balance(&address(1), &Color::BASE).await.unwrap(), 1);
    }

    fn header(index: u64) -> BlockHeader {
        BlockHeader {
            index,
            prev_state_hash: HashValue::NIL,
            state_hash: HashValue::NIL,
            anchor: TxId::default(),
            timestamp: 0,
            request_ids: Vec::new(),
        }
    }

    fn post_to(chain: ChainId) -> OutboundEffect {
        OutboundEffect::PostRequest {
            sender: agent(1),
            section: RequestSection::new(ContractId::new(chain, Hname::of("c")), Hname::of("f"))
                .with_transfer(ColoredBalances::base(2)),
        }
    }

    fn withdrawal(to: Address, amount: u64) -> OutboundEffect {
        OutboundEffect::TransferToAddress {
            from: agent(1),
            address: to,
            transfer: ColoredBalances::base(amount),
        }
    }

    #[tokio::test]
    async fn transition_posting_to_closed_chain_changes_nothing() {
        let ledger = InMemoryLedger::new();
        let chain = chain_id(1);
        let _feed = ledger.subscribe(&chain, 4).await.unwrap();
        ledger.close_chain(&chain_id(2));

        for _ in 0..3 {
            let err = ledger
                .post_state_transition(
                    &chain,
                    &header(1),
                    vec![withdrawal(address(7), 5), post_to(chain_id(2))],
                )
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::Rejected(_)));
        }
        assert_eq!(ledger.balance(&address(7), &Color::BASE).await.unwrap(), 0);
        assert!(ledger.anchors(&chain).is_empty());
        assert!(ledger.undelivered().is_empty());
    }

    #[tokio::test]
    async fn dropped_feed_keeps_requests_as_undelivered() {
        let ledger = InMemoryLedger::new();
        let chain = chain_id(1);
        let _feed = ledger.subscribe(&chain, 4).await.unwrap();
        drop(ledger.subscribe(&chain_id(2), 4).await.unwrap());

        ledger
            .post_state_transition(
                &chain,
                &header(1),
                vec![withdrawal(address(7), 5), post_to(chain_id(2))],
            )
            .await
            .unwrap();
        assert_eq!(ledger.balance(&address(7), &Color::BASE).await.unwrap(), 5);
        assert_eq!(ledger.anchors(&chain).len(), 1);
        let undelivered = ledger.undelivered();
        assert_eq!(undelivered.len(), 1);
        assert_eq!(undelivered[0].target.chain_id, chain_id(2));
    }
}
