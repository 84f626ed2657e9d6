//! §6 `GET /api/v1/metrics`: a point-in-time snapshot, never itself
//! persisted or exported — plain JSON, no Prometheus exporter (§10.6).

use sk_common::rpc::MetricsResponse;

use crate::engine::Engine;

impl Engine {
    pub fn metrics(&self) -> MetricsResponse {
        MetricsResponse {
            replica_id: self.config.replica_id.clone(),
            state: self.consensus.state.role_label().to_string(),
            term: self.consensus.state.term(),
            latest_lsn: self.lsn_counter.get(),
            wal_count: self.wal.count().unwrap_or(0),
            quorum_size: self.membership.quorum_size(),
            peer_count: self.membership.peer_count(),
            compression_enabled: self.config.compression_enabled,
            compression_ratio: *self.last_compression_ratio.lock(),
            timeline_count: self.timelines.list().len(),
            default_timeline: sk_common::DEFAULT_TIMELINE_ID.to_string(),
        }
    }
}
