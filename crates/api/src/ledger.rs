// Path: crates/api/src/ledger.rs
//! The external ledger the chain is anchored to.

use async_trait::async_trait;
use chroma_types::app::{
    Address, BlockHeader, ChainId, Color, OutboundEffect, RequestRef, RequestSection, TxId,
};
use chroma_types::error::LedgerError;
use tokio::sync::mpsc;

/// Posts and reads transactions on the underlying ledger.
///
/// Transaction construction, signing and confirmation are the
/// implementation's concern; each posting method resolves once the
/// transaction is confirmed.
#[async_trait]
pub trait Level1Client: Send + Sync {
    /// Posts a transaction from `sender` carrying requests to `chain`. The
    /// attached transfers are debited from `sender`.
    async fn post_request_transaction(
        &self,
        sender: &Address,
        chain: &ChainId,
        sections: Vec<RequestSection>,
    ) -> Result<TxId, LedgerError>;

    /// Anchors a block and realizes its outbound effects.
    async fn post_state_transition(
        &self,
        chain: &ChainId,
        header: &BlockHeader,
        outbound: Vec<OutboundEffect>,
    ) -> Result<TxId, LedgerError>;

    /// Tokens of `color` held by `address` on the ledger.
    async fn balance(&self, address: &Address, color: &Color) -> Result<u64, LedgerError>;

    /// Opens the feed of requests addressed to `chain`.
    async fn subscribe(
        &self,
        chain: &ChainId,
        capacity: usize,
    ) -> Result<mpsc::Receiver<RequestRef>, LedgerError>;
}
