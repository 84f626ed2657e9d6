use std::collections::HashSet;

use parking_lot::RwLock;
use sk_common::quorum_size;

/// §4.4 membership registry: the peer set excluding self, plus the derived
/// quorum size. Recomputed on any mutation, guarded by its own lock per the
/// fine-grained-locking policy in §5.
pub struct MembershipRegistry {
    inner: RwLock<HashSet<String>>,
}

impl MembershipRegistry {
    pub fn new(initial_peers: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner: RwLock::new(initial_peers.into_iter().collect()),
        }
    }

    pub fn add_peer(&self, endpoint: String) {
        self.inner.write().insert(endpoint);
    }

    pub fn remove_peer(&self, endpoint: &str) {
        self.inner.write().remove(endpoint);
    }

    pub fn get_peers(&self) -> Vec<String> {
        self.inner.read().iter().cloned().collect()
    }

    pub fn peer_count(&self) -> usize {
        self.inner.read().len()
    }

    /// `⌊(N+1)/2⌋+1` where N is the number of peers (self counted
    /// separately, per §3).
    pub fn quorum_size(&self) -> usize {
        quorum_size(self.peer_count())
    }

    pub fn replace(&self, new_set: impl IntoIterator<Item = String>) {
        *self.inner.write() = new_set.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_recomputed_on_mutation() {
        let m = MembershipRegistry::new([]);
        assert_eq!(m.quorum_size(), 1);

        m.add_peer("http://a".into());
        m.add_peer("http://b".into());
        assert_eq!(m.peer_count(), 2);
        assert_eq!(m.quorum_size(), 2);

        m.remove_peer("http://a");
        assert_eq!(m.peer_count(), 1);
        assert_eq!(m.quorum_size(), 2);
    }

    #[test]
    fn replace_swaps_full_set() {
        let m = MembershipRegistry::new(["http://a".to_string()]);
        m.replace(["http://b".to_string(), "http://c".to_string()]);
        let mut peers = m.get_peers();
        peers.sort();
        assert_eq!(peers, vec!["http://b".to_string(), "http://c".to_string()]);
    }
}
