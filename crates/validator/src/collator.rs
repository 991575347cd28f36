// Path: crates/validator/src/collator.rs
//! Selection of the requests whose time lock has elapsed.

use crate::backlog::Backlog;
use chroma_types::app::Batch;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The chain's logical time. Only moved forward by the host.
#[derive(Debug, Default)]
pub struct LogicalClock(AtomicU64);

impl LogicalClock {
    pub fn new(start: u64) -> Self {
        Self(AtomicU64::new(start))
    }

    pub fn now(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Moves the clock forward by `delta` and returns the new time.
    pub fn advance(&self, delta: u64) -> u64 {
        let prev = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(delta))
            })
            .unwrap_or_else(|t| t);
        prev.saturating_add(delta)
    }

    /// Sets the clock, never moving it backwards.
    pub fn set(&self, time: u64) {
        self.0.fetch_max(time, Ordering::AcqRel);
    }
}

/// Partitions the backlog into a ready batch and the still-locked remainder.
#[derive(Debug, Clone)]
pub struct BatchCollator {
    backlog: Arc<Backlog>,
}

impl BatchCollator {
    pub fn new(backlog: Arc<Backlog>) -> Self {
        Self { backlog }
    }

    /// Takes every request that is ready at `logical_time`, in backlog order.
    /// The batch carries `logical_time` as its timestamp and no anchor yet.
    pub fn collate(&self, logical_time: u64) -> Batch {
        self.collate_at_most(logical_time, usize::MAX)
    }

    /// Like [`collate`](Self::collate), but takes only the first `limit`
    /// ready requests and leaves the rest in the backlog.
    pub fn collate_at_most(&self, logical_time: u64, limit: usize) -> Batch {
        let mut taken = 0;
        let ready = self.backlog.drain_matching(|request| {
            if taken < limit && request.is_ready_at(logical_time) {
                taken += 1;
                true
            } else {
                false
            }
        });
        Batch::new(ready, logical_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_test_utils::fixtures::{agent, chain_id, RequestBuilder};
    use chroma_types::app::RequestRef;
    use proptest::prelude::*;

    fn request(n: u64, time_lock: u64) -> RequestRef {
        RequestBuilder::new(chain_id(1), agent(1), "c", "f")
            .id(n)
            .time_lock(time_lock)
            .build()
    }

    #[test]
    fn unlocked_and_elapsed_requests_are_ready() {
        let backlog = Arc::new(Backlog::new());
        backlog.push(request(1, 0));
        backlog.push(request(2, 10));
        backlog.push(request(3, 5));
        let collator = BatchCollator::new(backlog.clone());

        let batch = collator.collate(5);
        assert_eq!(batch.timestamp, 5);
        assert_eq!(batch.requests, vec![request(1, 0), request(3, 5)]);
        assert_eq!(backlog.len(), 1);

        assert!(collator.collate(9).requests.is_empty());
        assert_eq!(collator.collate(10).requests, vec![request(2, 10)]);
    }

    #[test]
    fn limited_collation_takes_the_oldest_ready_requests() {
        let backlog = Arc::new(Backlog::new());
        backlog.push(request(1, 9));
        backlog.push(request(2, 0));
        backlog.push(request(3, 0));
        let collator = BatchCollator::new(backlog.clone());

        assert_eq!(collator.collate_at_most(0, 1).requests, vec![request(2, 0)]);
        assert_eq!(collator.collate_at_most(9, 1).requests, vec![request(1, 9)]);
        assert!(collator.collate_at_most(9, 0).requests.is_empty());
        assert_eq!(backlog.len(), 1);
    }

    #[test]
    fn clock_advances_and_never_goes_back() {
        let clock = LogicalClock::new(3);
        assert_eq!(clock.advance(4), 7);
        clock.set(2);
        assert_eq!(clock.now(), 7);
        clock.set(20);
        assert_eq!(clock.now(), 20);
        assert_eq!(clock.advance(u64::MAX), u64::MAX);
    }

    proptest! {
        #[test]
        fn collation_partitions_by_time_lock(
            locks in proptest::collection::vec(0u64..20, 0..40),
            now in 0u64..20,
        ) {
            let backlog = Arc::new(Backlog::new());
            let requests: Vec<_> = locks
                .iter()
                .enumerate()
                .map(|(i, lock)| request(i as u64, *lock))
                .collect();
            backlog.push_all(requests.clone());

            let batch = BatchCollator::new(backlog.clone()).collate(now);
            let remaining = backlog.drain_matching(|_| true);

            let (expected_ready, expected_rest): (Vec<_>, Vec<_>) = requests
                .into_iter()
                .partition(|r| r.time_lock == 0 || r.time_lock <= now);
            prop_assert_eq!(batch.requests, expected_ready);
            prop_assert!(remaining.iter().all(|r| r.time_lock > now));
            prop_assert_eq!(remaining, expected_rest);
        }
    }
}
