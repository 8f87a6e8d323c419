//! # Pending Request Table
//!
//! Tracks in-flight `request` calls between the moment a correlation id is
//! allocated and the moment a matching Response, ErrorResponse, timeout, or
//! teardown completes them.
//!
//! Lookup by correlation id (on Response/ErrorResponse arrival) needs to be
//! O(1); the timeout sweep needs insertion order so it can stop scanning at
//! the first not-yet-expired entry. A single map can't give both cheaply, so
//! this pairs a [`DashMap`] keyed by correlation id with a `Mutex`-guarded
//! FIFO queue of `(id, enqueued_at)` that records arrival order.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::oneshot;

use crate::error::PeerError;

/// What a waiter resolves with: the raw response body bytes (empty for a
/// void response), or an error to reject the caller's future with. The
/// concrete response type is only known at the `request` call site, so
/// decoding happens there, not in the pending table.
pub(crate) type WaiterResult = Result<Vec<u8>, PeerError>;

/// A single in-flight request's completion state.
pub(crate) struct Waiter {
    pub method: u16,
    pub tx: oneshot::Sender<WaiterResult>,
}

struct OrderEntry {
    id: u32,
    enqueued_at: Instant,
}

/// The peer's table of outstanding requests.
pub(crate) struct PendingTable {
    waiters: DashMap<u32, Waiter>,
    order: Mutex<VecDeque<OrderEntry>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            waiters: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
        }
    }

    /// Inserts a new waiter. Returns `true` if the table was empty before
    /// this insertion (the caller uses this to decide whether to start the
    /// timeout checker).
    pub fn insert(&self, id: u32, method: u16, tx: oneshot::Sender<WaiterResult>) -> bool {
        let was_empty = self.waiters.is_empty();
        self.waiters.insert(id, Waiter { method, tx });
        self.order.lock().unwrap().push_back(OrderEntry {
            id,
            enqueued_at: Instant::now(),
        });
        was_empty
    }

    /// Removes and returns the waiter for `id`, if any. Returns whether the
    /// table is now empty (the caller uses this to decide whether to stop
    /// the timeout checker).
    pub fn remove(&self, id: u32) -> (Option<Waiter>, bool) {
        let waiter = self.waiters.remove(&id).map(|(_, w)| w);
        (waiter, self.waiters.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Sweeps expired entries in insertion order, stopping at the first
    /// entry younger than `timeout`. Returns the removed waiters (to be
    /// rejected by the caller) and whether the table is empty afterward.
    ///
    /// Entries that were already completed (response/error arrived, or a
    /// prior sweep already took them) are skipped without being mistaken for
    /// expired: `order` may lag `waiters` by entries that already resolved.
    pub fn sweep_expired(&self, timeout: std::time::Duration) -> (Vec<(u32, Waiter)>, bool) {
        let now = Instant::now();
        let mut expired_ids = Vec::new();

        {
            let mut order = self.order.lock().unwrap();
            while let Some(front) = order.front() {
                if now.duration_since(front.enqueued_at) >= timeout {
                    let entry = order.pop_front().unwrap();
                    expired_ids.push(entry.id);
                } else {
                    break;
                }
            }
        }

        let mut expired = Vec::with_capacity(expired_ids.len());
        for id in expired_ids {
            if let Some((_, waiter)) = self.waiters.remove(&id) {
                expired.push((id, waiter));
            }
        }

        (expired, self.waiters.is_empty())
    }

    /// Removes every waiter (teardown). Returns them all for rejection.
    pub fn drain_all(&self) -> Vec<(u32, Waiter)> {
        self.order.lock().unwrap().clear();
        let ids: Vec<u32> = self.waiters.iter().map(|e| *e.key()).collect();
        let mut drained = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((_, waiter)) = self.waiters.remove(&id) {
                drained.push((id, waiter));
            }
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn insert_reports_whether_table_was_empty() {
        let table = PendingTable::new();
        let (tx1, _rx1) = oneshot::channel();
        assert!(table.insert(1, 0, tx1));

        let (tx2, _rx2) = oneshot::channel();
        assert!(!table.insert(2, 0, tx2));
    }

    #[test]
    fn remove_reports_whether_table_became_empty() {
        let table = PendingTable::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        table.insert(1, 0, tx1);
        table.insert(2, 0, tx2);

        let (waiter, is_empty) = table.remove(1);
        assert!(waiter.is_some());
        assert!(!is_empty);

        let (waiter, is_empty) = table.remove(2);
        assert!(waiter.is_some());
        assert!(is_empty);
    }

    #[test]
    fn remove_of_unknown_id_returns_none() {
        let table = PendingTable::new();
        let (waiter, is_empty) = table.remove(999);
        assert!(waiter.is_none());
        assert!(is_empty);
    }

    #[test]
    fn sweep_stops_at_first_unexpired_entry_in_insertion_order() {
        let table = PendingTable::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        table.insert(1, 0, tx1);
        sleep(std::time::Duration::from_millis(20));
        table.insert(2, 0, tx2);

        // Only the first entry has aged past this threshold.
        let (expired, is_empty) = table.sweep_expired(std::time::Duration::from_millis(10));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, 1);
        assert!(!is_empty);
    }

    #[test]
    fn sweep_skips_entries_already_completed() {
        let table = PendingTable::new();
        let (tx1, _rx1) = oneshot::channel();
        table.insert(1, 0, tx1);
        table.remove(1);

        let (expired, is_empty) = table.sweep_expired(std::time::Duration::from_millis(0));
        assert!(expired.is_empty());
        assert!(is_empty);
    }

    #[test]
    fn drain_all_empties_the_table() {
        let table = PendingTable::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        table.insert(1, 0, tx1);
        table.insert(2, 0, tx2);

        let drained = table.drain_all();
        assert_eq!(drained.len(), 2);
        assert!(table.is_empty());
    }
}
