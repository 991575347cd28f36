// Path: crates/types/src/app/block.rs
use super::{HashValue, Params, RequestId, TxId};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The header of a committed block: its position in the hash chain.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block index; the origin block is 0.
    pub index: u64,
    /// State hash after the previous block.
    pub prev_state_hash: HashValue,
    /// State hash after this block.
    pub state_hash: HashValue,
    /// The anchoring transaction identity.
    pub anchor: TxId,
    /// Logical time of the batch.
    pub timestamp: u64,
    /// Requests executed in this block, in order.
    pub request_ids: Vec<RequestId>,
}

/// The key/value mutations produced by one batch, with keys in ascending order.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// Inserted or updated entries.
    pub inserts: Vec<(Vec<u8>, Vec<u8>)>,
    /// Deleted keys.
    pub deletes: Vec<Vec<u8>>,
}

impl Block {
    /// The block index.
    pub fn index(&self) -> u64 {
        self.header.index
    }

    /// Total number of key mutations.
    pub fn mutation_count(&self) -> usize {
        self.inserts.len() + self.deletes.len()
    }
}

/// How a request ended.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum RequestOutcome {
    /// The entry point returned this mapping.
    Success(Params),
    /// The request failed; its call chain's mutations were discarded.
    Failure {
        /// Stable error code.
        code: String,
        /// Human readable reason.
        reason: String,
    },
}

/// The per-request result of a batch run.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct RequestResult {
    /// The request.
    pub request_id: RequestId,
    /// The outcome.
    pub outcome: RequestOutcome,
    /// Events emitted by contract code. Diagnostics only.
    pub events: Vec<String>,
}

impl RequestResult {
    /// Whether the request succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RequestOutcome::Success(_))
    }

    /// The returned mapping of a successful request.
    pub fn output(&self) -> Option<&Params> {
        match &self.outcome {
            RequestOutcome::Success(p) => Some(p),
            RequestOutcome::Failure { .. } => None,
        }
    }

    /// The error code of a failed request.
    pub fn error_code(&self) -> Option<&str> {
        match &self.outcome {
            RequestOutcome::Success(_) => None,
            RequestOutcome::Failure { code, .. } => Some(code),
        }
    }
}
