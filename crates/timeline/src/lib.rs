use std::collections::HashMap;

use parking_lot::RwLock;
use sk_common::{Lsn, SafekeeperError, Timeline, TimelineId, DEFAULT_TIMELINE_ID};

/// §4.3 timeline registry: an in-memory `id -> Timeline` map guarded by a
/// reader-writer lock.
pub struct TimelineRegistry {
    inner: RwLock<HashMap<TimelineId, Timeline>>,
}

impl TimelineRegistry {
    /// A fresh registry with the well-known root timeline already present.
    pub fn new() -> Self {
        let mut map = HashMap::new();
        map.insert(
            DEFAULT_TIMELINE_ID.to_string(),
            Timeline::root(DEFAULT_TIMELINE_ID.to_string(), chrono::Utc::now()),
        );
        Self { inner: RwLock::new(map) }
    }

    pub fn create(
        &self,
        id: TimelineId,
        parent_lsn: Lsn,
        parent_id: TimelineId,
    ) -> Result<Timeline, SafekeeperError> {
        let mut map = self.inner.write();
        if map.contains_key(&id) {
            return Err(SafekeeperError::AlreadyExists(format!("timeline {id}")));
        }
        let timeline = Timeline {
            id: id.clone(),
            created_at: chrono::Utc::now(),
            parent_lsn,
            parent_timeline_id: parent_id,
            latest_lsn: parent_lsn,
        };
        map.insert(id, timeline.clone());
        Ok(timeline)
    }

    pub fn get(&self, id: &str) -> Option<Timeline> {
        self.inner.read().get(id).cloned()
    }

    /// Lifts `latest_lsn` monotonically; no-op if `lsn <= current`.
    pub fn update_latest(&self, id: &str, lsn: Lsn) {
        if let Some(timeline) = self.inner.write().get_mut(id) {
            if lsn > timeline.latest_lsn {
                timeline.latest_lsn = lsn;
            }
        }
    }

    pub fn list(&self) -> Vec<Timeline> {
        self.inner.read().values().cloned().collect()
    }

    /// Convenience: `create(new_id, at_lsn, from_id)` after verifying
    /// `from_id` exists.
    pub fn branch(
        &self,
        new_id: TimelineId,
        from_id: &str,
        at_lsn: Lsn,
    ) -> Result<Timeline, SafekeeperError> {
        if self.get(from_id).is_none() {
            return Err(SafekeeperError::NotFound(format!("timeline {from_id}")));
        }
        self.create(new_id, at_lsn, from_id.to_string())
    }

    /// Used during recovery reset (§4.3).
    pub fn delete(&self, id: &str) {
        self.inner.write().remove(id);
    }
}

impl Default for TimelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeline_created_on_new() {
        let reg = TimelineRegistry::new();
        let ids: Vec<_> = reg.list().into_iter().map(|t| t.id).collect();
        assert!(ids.contains(&DEFAULT_TIMELINE_ID.to_string()));
    }

    #[test]
    fn create_rejects_duplicate_id() {
        let reg = TimelineRegistry::new();
        reg.create("tl-1".into(), 5000, "default".into()).unwrap();
        let err = reg.create("tl-1".into(), 6000, "default".into()).unwrap_err();
        assert!(matches!(err, SafekeeperError::AlreadyExists(_)));
    }

    #[test]
    fn latest_lsn_only_advances() {
        let reg = TimelineRegistry::new();
        reg.update_latest(DEFAULT_TIMELINE_ID, 100);
        assert_eq!(reg.get(DEFAULT_TIMELINE_ID).unwrap().latest_lsn, 100);
        reg.update_latest(DEFAULT_TIMELINE_ID, 50);
        assert_eq!(reg.get(DEFAULT_TIMELINE_ID).unwrap().latest_lsn, 100);
    }

    #[test]
    fn branch_requires_existing_parent() {
        let reg = TimelineRegistry::new();
        let err = reg.branch("child".into(), "nope", 10).unwrap_err();
        assert!(matches!(err, SafekeeperError::NotFound(_)));

        let child = reg.branch("child".into(), "default", 10).unwrap();
        assert_eq!(child.parent_timeline_id, "default");
        assert_eq!(child.parent_lsn, 10);
    }
}
