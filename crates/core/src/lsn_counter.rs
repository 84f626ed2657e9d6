use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sk_common::Lsn;
use sk_consensus::election::LocalLog;

/// Shared, atomically-updated view of the highest locally-durable LSN.
/// Exists so `sk-consensus` can read it (for vote requests and heartbeats)
/// without depending on `sk-wal` directly.
#[derive(Clone)]
pub struct LsnCounter(Arc<AtomicU64>);

impl LsnCounter {
    pub fn new(initial: Lsn) -> Self {
        Self(Arc::new(AtomicU64::new(initial)))
    }

    pub fn get(&self) -> Lsn {
        self.0.load(Ordering::SeqCst)
    }

    /// Assigns the next LSN (current + 1) and advances the counter to it.
    pub fn next(&self) -> Lsn {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Advances the counter to `lsn` if it's higher than the current value;
    /// used when applying records received from a leader or a recovery
    /// donor, whose LSNs are assigned elsewhere.
    pub fn advance_to(&self, lsn: Lsn) {
        self.0.fetch_max(lsn, Ordering::SeqCst);
    }
}

impl LocalLog for LsnCounter {
    fn latest_lsn(&self) -> Lsn {
        self.get()
    }
}
