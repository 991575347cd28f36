//! Deterministic identities and request builders for reproducible tests

use chroma_types::app::{
    Address, AgentId, ChainId, Color, ColoredBalances, ContractId, HashValue, Hname, Params,
    RequestId, RequestRef, TxId,
};

/// A ledger address derived from `n`
pub fn address(n: u8) -> Address {
    Address(HashValue::digest(&[b"test/address", &[n]]).0)
}

/// The agent of the ledger address `n`
pub fn agent(n: u8) -> AgentId {
    AgentId::Address(address(n))
}

/// A chain id derived from `n`
pub fn chain_id(n: u8) -> ChainId {
    ChainId(HashValue::digest(&[b"test/chain", &[n]]).0)
}

/// A non-base token color
pub fn red() -> Color {
    Color(HashValue::digest(&[b"test/color/red"]).0)
}

/// A transaction id derived from `n`
pub fn tx(n: u64) -> TxId {
    TxId(HashValue::digest(&[b"test/tx", &n.to_be_bytes()]).0)
}

/// Builder for requests that bypass the ledger
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    request: RequestRef,
}

impl RequestBuilder {
    /// A request from `sender` to `contract.entry_point` on `chain`
    pub fn new(chain: ChainId, sender: AgentId, contract: &str, entry_point: &str) -> Self {
        Self {
            request: RequestRef {
                id: RequestId::new(tx(0), 0),
                sender,
                target: ContractId::new(chain, Hname::of(contract)),
                entry_point: Hname::of(entry_point),
                params: Params::new(),
                transfer: ColoredBalances::new(),
                time_lock: 0,
            },
        }
    }

    /// Sets the request id to `(tx(n), 0)`
    pub fn id(mut self, n: u64) -> Self {
        self.request.id = RequestId::new(tx(n), 0);
        self
    }

    /// Sets the arguments
    pub fn params(mut self, params: Params) -> Self {
        self.request.params = params;
        self
    }

    /// Sets the attached tokens
    pub fn transfer(mut self, transfer: ColoredBalances) -> Self {
        self.request.transfer = transfer;
        self
    }

    /// Sets the time lock
    pub fn time_lock(mut self, time_lock: u64) -> Self {
        self.request.time_lock = time_lock;
        self
    }

    /// Finishes the request
    pub fn build(self) -> RequestRef {
        self.request
    }
}
