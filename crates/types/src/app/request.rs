// Path: crates/types/src/app/request.rs
use super::{Address, AgentId, ColoredBalances, ContractId, Hname, Params, RequestId, TxId};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// One inbound request observed on the ledger. Immutable once observed.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct RequestRef {
    /// Globally unique identity of the request.
    pub id: RequestId,
    /// The agent that sent the request.
    pub sender: AgentId,
    /// The contract being called.
    pub target: ContractId,
    /// The entry point being called.
    pub entry_point: Hname,
    /// Call arguments.
    pub params: Params,
    /// Tokens attached to the request.
    pub transfer: ColoredBalances,
    /// Earliest logical time at which the request may be executed; zero if unlocked.
    pub time_lock: u64,
}

impl RequestRef {
    /// Whether the request's time lock has elapsed at `logical_time`.
    pub fn is_ready_at(&self, logical_time: u64) -> bool {
        self.time_lock == 0 || self.time_lock <= logical_time
    }
}

/// The request payload carried inside a ledger transaction or emitted by a
/// contract as an outbound request.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct RequestSection {
    /// The contract being called.
    pub target: ContractId,
    /// The entry point being called.
    pub entry_point: Hname,
    /// Call arguments.
    pub params: Params,
    /// Tokens attached to the request.
    pub transfer: ColoredBalances,
    /// Absolute logical time lock; zero if unlocked.
    pub time_lock: u64,
}

impl RequestSection {
    /// A request section with no arguments, transfer or time lock.
    pub fn new(target: ContractId, entry_point: Hname) -> Self {
        Self {
            target,
            entry_point,
            params: Params::new(),
            transfer: ColoredBalances::new(),
            time_lock: 0,
        }
    }

    /// Sets the call arguments.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Sets the attached tokens.
    pub fn with_transfer(mut self, transfer: ColoredBalances) -> Self {
        self.transfer = transfer;
        self
    }

    /// Sets the time lock.
    pub fn with_time_lock(mut self, time_lock: u64) -> Self {
        self.time_lock = time_lock;
        self
    }

    /// Materializes the section as an observed request.
    pub fn into_request(self, id: RequestId, sender: AgentId) -> RequestRef {
        RequestRef {
            id,
            sender,
            target: self.target,
            entry_point: self.entry_point,
            params: self.params,
            transfer: self.transfer,
            time_lock: self.time_lock,
        }
    }
}

/// An effect staged by a committed call that must be realized on the ledger
/// by the anchoring transaction.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum OutboundEffect {
    /// Tokens leaving the chain to a ledger address.
    TransferToAddress {
        /// The on-chain agent the tokens were debited from.
        from: AgentId,
        /// The receiving ledger address.
        address: Address,
        /// The tokens sent.
        transfer: ColoredBalances,
    },
    /// A request to a contract, on this or another chain.
    PostRequest {
        /// The contract that issued the request.
        sender: AgentId,
        /// The request payload, including the tokens debited from the sender.
        section: RequestSection,
    },
}

/// An ordered sequence of requests executed against one state snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Batch {
    /// Requests in execution order.
    pub requests: Vec<RequestRef>,
    /// Tokens entering the chain that are not tied to a request.
    pub free_tokens: ColoredBalances,
    /// Transfers of requests dropped without execution, credited back to
    /// their senders' on-chain accounts before any request runs.
    pub refunds: Vec<(AgentId, ColoredBalances)>,
    /// The logical time of the batch, visible to contracts as the timestamp.
    pub timestamp: u64,
    /// The anchoring transaction identity the resulting block is bound to.
    pub anchor: TxId,
}

impl Batch {
    /// A batch of `requests` at `timestamp`, not yet bound to an anchor.
    pub fn new(requests: Vec<RequestRef>, timestamp: u64) -> Self {
        Self {
            requests,
            timestamp,
            ..Default::default()
        }
    }

    /// Binds the batch to an anchoring transaction.
    pub fn with_anchor(mut self, anchor: TxId) -> Self {
        self.anchor = anchor;
        self
    }

    /// Attaches refunds of previously dropped requests.
    pub fn with_refunds(mut self, refunds: Vec<(AgentId, ColoredBalances)>) -> Self {
        self.refunds = refunds;
        self
    }

    /// Whether the batch carries no requests, refunds or free tokens.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.refunds.is_empty() && self.free_tokens.is_empty()
    }

    /// Identities of the requests, in order.
    pub fn request_ids(&self) -> Vec<RequestId> {
        self.requests.iter().map(|r| r.id).collect()
    }
}
