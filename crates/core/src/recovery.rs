//! §4.9 recovery: bulk-pull timelines and windowed WAL ranges from a donor
//! peer after a restart or a fresh join, grounded on `recover()`'s
//! scan-then-rebuild shape in the teacher's WAL crate, generalized from a
//! local segment scan to a remote pull.

use sk_common::{Lsn, SafekeeperError};

use crate::engine::Engine;

/// Records are pulled in windows this wide so a single request can't block
/// the donor indefinitely on an unbounded range.
const RECOVERY_WINDOW: Lsn = 100;

impl Engine {
    /// Pulls every timeline and the full WAL range from `donor`, applying
    /// whatever we don't already have locally. Also probes the donor's
    /// metrics to adopt its term if it's ahead of ours, per §4.9 step 5
    /// (stepping down to Follower rather than recovering while still
    /// candidating or leading in a stale term).
    pub async fn recover_from_peer(&self, donor: &str) -> Result<Lsn, SafekeeperError> {
        let metrics = self.peer_client.get_metrics(donor).await?;
        if metrics.term > self.consensus.state.term() {
            self.consensus.state.observe_term(metrics.term);
        }

        self.recover_timelines(donor).await?;
        self.recover_wal_range(donor).await
    }

    async fn recover_timelines(&self, donor: &str) -> Result<(), SafekeeperError> {
        let remote = self.peer_client.get_timelines(donor).await?;
        for timeline in remote.timelines {
            if self.timelines.get(&timeline.id).is_none() {
                let _ = self.timelines.create(
                    timeline.id.clone(),
                    timeline.parent_lsn,
                    timeline.parent_timeline_id.clone(),
                );
            }
            self.timelines.update_latest(&timeline.id, timeline.latest_lsn);
        }
        Ok(())
    }

    async fn recover_wal_range(&self, donor: &str) -> Result<Lsn, SafekeeperError> {
        let donor_latest = self.peer_client.get_latest_lsn(donor).await?.latest_lsn;
        let mut cursor = self.lsn_counter.get() + 1;

        while cursor <= donor_latest {
            let window_end = (cursor + RECOVERY_WINDOW - 1).min(donor_latest);
            let range = self.peer_client.get_wal_range(donor, cursor, window_end).await?;
            for entry in range.wals {
                self.wal
                    .append(entry.lsn, &entry.wal_data, false)
                    .map_err(SafekeeperError::StorageIo)?;
                self.lsn_counter.advance_to(entry.lsn);
            }
            cursor = window_end + 1;
        }

        self.timelines.update_latest(sk_common::DEFAULT_TIMELINE_ID, donor_latest);
        Ok(donor_latest)
    }

    /// Pulls a single named timeline (and the WAL up to its `latest_lsn`)
    /// from the first reachable donor in `peer_endpoints`.
    pub async fn recover_timeline(
        &self,
        timeline_id: &str,
        peer_endpoints: &[String],
    ) -> Result<(), SafekeeperError> {
        for donor in peer_endpoints {
            match self.peer_client.get_timeline(donor, timeline_id).await {
                Ok(resp) => {
                    let timeline = resp.timeline;
                    if self.timelines.get(&timeline.id).is_none() {
                        let _ = self.timelines.create(
                            timeline.id.clone(),
                            timeline.parent_lsn,
                            timeline.parent_timeline_id.clone(),
                        );
                    }
                    self.timelines.update_latest(&timeline.id, timeline.latest_lsn);
                    self.recover_wal_range(donor).await?;
                    return Ok(());
                }
                Err(err) => {
                    tracing::debug!(%err, donor, timeline_id, "donor unreachable or lacks timeline");
                }
            }
        }
        Err(SafekeeperError::NotFound(format!(
            "timeline {timeline_id} not found on any of {} donors",
            peer_endpoints.len()
        )))
    }
}
