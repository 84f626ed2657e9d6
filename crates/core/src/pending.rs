//! §4.7 pending-record table: tracks which peers have acked a record that's
//! durable locally but not yet at quorum.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use sk_common::{Lsn, ReplicaId};
use tokio::sync::Notify;

struct PendingRecord {
    required: usize,
    acked: Mutex<HashSet<ReplicaId>>,
    notify: Notify,
}

/// Keyed by LSN, guarded by its own lock per the no-nested-locking policy —
/// never held while touching the WAL store or the timeline registry.
pub struct PendingTable {
    inner: Mutex<HashMap<Lsn, Arc<PendingRecord>>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    /// Start tracking `lsn`, pre-seeded with the local ack (`self_id`).
    pub fn track(&self, lsn: Lsn, required: usize, self_id: &ReplicaId) -> Arc<PendingRecordHandle> {
        let mut acked = HashSet::new();
        acked.insert(self_id.clone());
        let record = Arc::new(PendingRecord { required, acked: Mutex::new(acked), notify: Notify::new() });
        self.inner.lock().insert(lsn, record.clone());
        Arc::new(PendingRecordHandle { lsn, record })
    }

    /// Record an ack from `peer` for `lsn`, waking any waiter if quorum is
    /// now reached. No-op if we're no longer tracking that LSN.
    pub fn ack(&self, lsn: Lsn, peer: ReplicaId) {
        let record = self.inner.lock().get(&lsn).cloned();
        if let Some(record) = record {
            let reached = {
                let mut acked = record.acked.lock();
                acked.insert(peer);
                acked.len() >= record.required
            };
            if reached {
                record.notify.notify_waiters();
            }
        }
    }

    pub fn forget(&self, lsn: Lsn) {
        self.inner.lock().remove(&lsn);
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PendingRecordHandle {
    lsn: Lsn,
    record: Arc<PendingRecord>,
}

impl PendingRecordHandle {
    pub fn lsn(&self) -> Lsn {
        self.lsn
    }

    fn ack_count(&self) -> usize {
        self.record.acked.lock().len()
    }

    pub fn quorum_reached(&self) -> bool {
        self.ack_count() >= self.record.required
    }

    /// Waits until quorum is reached or `timeout` elapses. Never an error —
    /// per §4.7 a quorum timeout is logged, not failed.
    pub async fn wait_for_quorum(&self, timeout: std::time::Duration) -> bool {
        if self.quorum_reached() {
            return true;
        }
        let _ = tokio::time::timeout(timeout, self.record.notify.notified()).await;
        self.quorum_reached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn quorum_wait_resolves_once_acked() {
        let table = PendingTable::new();
        let handle = table.track(10, 2, &"self".to_string());
        assert!(!handle.quorum_reached());

        let table2_handle = handle.clone();
        table.ack(10, "peer-a".to_string());
        assert!(table2_handle.quorum_reached());
        assert!(handle.wait_for_quorum(std::time::Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn quorum_wait_times_out_without_failing() {
        let table = PendingTable::new();
        let handle = table.track(10, 3, &"self".to_string());
        let reached = handle.wait_for_quorum(std::time::Duration::from_millis(20)).await;
        assert!(!reached);
    }
}
