// Path: crates/validator/src/backlog.rs
//! The shared queue of requests waiting to be collated.

use chroma_types::app::RequestRef;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

/// Requests observed on the ledger but not yet executed, in arrival order.
///
/// Producers insert concurrently; the single consumer removes requests with
/// [`drain_matching`](Self::drain_matching), which runs under the same lock
/// as inserts, so an insert is either fully visible to a drain or left for
/// the next one.
#[derive(Debug, Default)]
pub struct Backlog {
    queue: Mutex<VecDeque<RequestRef>>,
    inserted: Notify,
}

impl Backlog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request and wakes the consumer.
    pub fn push(&self, request: RequestRef) {
        self.queue.lock().push_back(request);
        self.inserted.notify_one();
    }

    /// Appends requests in order and wakes the consumer once.
    pub fn push_all(&self, requests: impl IntoIterator<Item = RequestRef>) {
        let added = {
            let mut queue = self.queue.lock();
            let before = queue.len();
            queue.extend(requests);
            queue.len() > before
        };
        if added {
            self.inserted.notify_one();
        }
    }

    /// Puts requests back at the front, ahead of everything queued since.
    pub fn requeue_front(&self, requests: Vec<RequestRef>) {
        if requests.is_empty() {
            return;
        }
        {
            let mut queue = self.queue.lock();
            for request in requests.into_iter().rev() {
                queue.push_front(request);
            }
        }
        self.inserted.notify_one();
    }

    /// Removes and returns every request matching `pred`. Both the removed
    /// and the retained requests keep their relative order.
    pub fn drain_matching<F>(&self, mut pred: F) -> Vec<RequestRef>
    where
        F: FnMut(&RequestRef) -> bool,
    {
        let mut queue = self.queue.lock();
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(queue.len());
        for request in queue.drain(..) {
            if pred(&request) {
                taken.push(request);
            } else {
                kept.push_back(request);
            }
        }
        *queue = kept;
        taken
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Resolves after the next insert, or immediately if an insert happened
    /// since the last wait.
    pub async fn notified(&self) {
        self.inserted.notified().await;
    }

    /// Wakes a waiting consumer without inserting anything.
    pub fn wake(&self) {
        self.inserted.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_test_utils::fixtures::{agent, chain_id, tx, RequestBuilder};
    use chroma_types::app::TxId;
    use std::sync::Arc;
    use std::time::Duration;

    fn request(n: u64) -> RequestRef {
        RequestBuilder::new(chain_id(1), agent(1), "c", "f").id(n).build()
    }

    fn ids(requests: &[RequestRef]) -> Vec<TxId> {
        requests.iter().map(|r| r.id.tx_id).collect()
    }

    #[test]
    fn drain_keeps_order_on_both_sides() {
        let backlog = Backlog::new();
        backlog.push_all((1..=6).map(request));
        let wanted = [tx(2), tx(4), tx(6)];
        let even = backlog.drain_matching(|r| wanted.contains(&r.id.tx_id));
        assert_eq!(ids(&even), wanted.to_vec());
        let rest = backlog.drain_matching(|_| true);
        assert_eq!(ids(&rest), vec![tx(1), tx(3), tx(5)]);
        assert!(backlog.is_empty());
    }

    #[test]
    fn requeued_requests_go_first() {
        let backlog = Backlog::new();
        backlog.push(request(3));
        backlog.requeue_front(vec![request(1), request(2)]);
        assert_eq!(
            ids(&backlog.drain_matching(|_| true)),
            vec![tx(1), tx(2), tx(3)]
        );
    }

    #[tokio::test]
    async fn push_wakes_a_waiting_consumer() {
        let backlog = Arc::new(Backlog::new());
        let waiter = {
            let backlog = backlog.clone();
            tokio::spawn(async move { backlog.notified().await })
        };
        tokio::task::yield_now().await;
        backlog.push(request(1));
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(backlog.len(), 1);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let backlog = Arc::new(Backlog::new());
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let backlog = backlog.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        backlog.push(request(t * 1000 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(backlog.len(), 400);
    }
}
