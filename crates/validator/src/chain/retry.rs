// Path: crates/validator/src/chain/retry.rs
//! Bookkeeping for batches that keep failing.
//!
//! A batch that fails `max_batch_attempts` times in a row is split: the
//! pipeline collates one request at a time until a block commits. A single
//! request that exhausts its attempts is dropped with a failure receipt, and
//! its transfer is credited back to the sender in the next committed block.

use chroma_types::app::{AgentId, ColoredBalances, RequestOutcome, RequestRef, RequestResult};
use chroma_types::error::{ChainError, ErrorCode};

/// What the pipeline does with a batch after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Verdict {
    /// Put the batch back and try again.
    Retry,
    /// Put the batch back and collate single requests from now on.
    Isolate,
    /// Give up on the request.
    Drop,
}

/// Retry state, owned by whoever holds the chain's writer lock.
#[derive(Debug, Default)]
pub(super) struct BatchRetry {
    failures: u32,
    isolating: bool,
    refunds: Vec<(AgentId, ColoredBalances)>,
}

impl BatchRetry {
    /// Most requests the next batch may take.
    pub fn batch_limit(&self) -> usize {
        if self.isolating {
            1
        } else {
            usize::MAX
        }
    }

    /// Refunds still owed to senders of dropped requests.
    pub fn pending_refunds(&self) -> Vec<(AgentId, ColoredBalances)> {
        self.refunds.clone()
    }

    /// Records a failed attempt of a batch of `len` requests.
    pub fn failed(&mut self, len: usize, max_attempts: u32) -> Verdict {
        self.failures += 1;
        if self.failures < max_attempts {
            return Verdict::Retry;
        }
        self.failures = 0;
        if len > 1 {
            self.isolating = true;
            Verdict::Isolate
        } else {
            Verdict::Drop
        }
    }

    /// Owes `request`'s transfer back to its sender and returns its receipt.
    pub fn drop_request(&mut self, request: &RequestRef, err: &ChainError) -> RequestResult {
        if !request.transfer.is_empty() {
            self.refunds.push((request.sender, request.transfer.clone()));
        }
        RequestResult {
            request_id: request.id,
            outcome: RequestOutcome::Failure {
                code: err.code().to_string(),
                reason: format!("dropped without execution: {}", err),
            },
            events: Vec::new(),
        }
    }

    /// A block committed: refunds are paid and batching goes back to normal.
    pub fn committed(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_test_utils::fixtures::{agent, chain_id, RequestBuilder};
    use chroma_types::error::LedgerError;

    #[test]
    fn repeated_failures_isolate_then_drop() {
        let mut retry = BatchRetry::default();
        assert_eq!(retry.failed(3, 2), Verdict::Retry);
        assert_eq!(retry.failed(3, 2), Verdict::Isolate);
        assert_eq!(retry.batch_limit(), 1);
        assert_eq!(retry.failed(1, 2), Verdict::Retry);
        assert_eq!(retry.failed(1, 2), Verdict::Drop);
        assert_eq!(retry.batch_limit(), 1);

        retry.committed();
        assert_eq!(retry.batch_limit(), usize::MAX);
        assert_eq!(retry.failed(1, 2), Verdict::Retry);
    }

    #[test]
    fn dropped_transfer_is_owed_until_commit() {
        let mut retry = BatchRetry::default();
        let request = RequestBuilder::new(chain_id(1), agent(2), "c", "f")
            .id(1)
            .transfer(ColoredBalances::base(5))
            .build();
        let err = ChainError::Ledger(LedgerError::Rejected("closed".into()));

        let receipt = retry.drop_request(&request, &err);
        assert_eq!(receipt.request_id, request.id);
        assert_eq!(receipt.error_code(), Some("CHAIN_LEDGER_ERROR"));
        assert_eq!(
            retry.pending_refunds(),
            vec![(agent(2), ColoredBalances::base(5))]
        );

        retry.committed();
        assert!(retry.pending_refunds().is_empty());
    }
}
