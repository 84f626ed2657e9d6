//! §4.7 replication pipeline: compress → append → ack self → fan out →
//! quorum wait (logged-not-failed timeout). §4.8 leader discovery and
//! forwarding for followers. Grounded on `StorageEngine::append_redo`'s
//! assign-then-persist shape, generalized from a single page store to a
//! replicated one.

use std::io;

use sk_common::rpc::ReplicateWalRequest;
use sk_common::{Lsn, SafekeeperError, WalRecord};

use crate::engine::Engine;

impl Engine {
    /// Entry point for a `stream_wal` call accepted locally. If we're not
    /// the leader, discovers the leader per §4.8 (probing the cached one,
    /// then scanning peers via `get_metrics`) and forwards to it; if no
    /// leader is known or reachable, falls back to appending locally so the
    /// write is never refused.
    pub async fn propose(&self, mut record: WalRecord) -> Result<Lsn, SafekeeperError> {
        if !self.consensus.state.is_leader() {
            if let Some(leader) = self.discover_leader().await {
                match self.forward_to_leader(&leader, &record).await {
                    Ok(lsn) => return Ok(lsn),
                    Err(err) => {
                        tracing::warn!(%err, leader, "forward to leader failed, appending locally");
                    }
                }
            }
        }

        // §5: the leader does not renumber — the LSN the caller presented is
        // the LSN we store at. The local counter only tracks the durable
        // high-water mark for vote requests, heartbeats, and recovery.
        let lsn = record.lsn;
        self.lsn_counter.advance_to(lsn);
        record.term = self.consensus.state.term();

        let (stored_payload, is_compressed) = self.maybe_compress(&record.payload)?;
        self.wal
            .append(lsn, &stored_payload, is_compressed)
            .map_err(SafekeeperError::StorageIo)?;

        let quorum = self.membership.quorum_size();
        let handle = self.pending.track(lsn, quorum, &self.config.replica_id);
        self.fan_out(lsn, &stored_payload, is_compressed, record.space_id, record.page_no, record.term);

        if handle.wait_for_quorum(self.config.quorum_timeout).await {
            tracing::debug!(lsn, "quorum reached");
        } else {
            tracing::warn!(lsn, quorum, "quorum not reached within timeout, write stays committed locally");
        }
        self.pending.forget(lsn);

        self.timelines.update_latest(sk_common::DEFAULT_TIMELINE_ID, lsn);
        self.maybe_backup(lsn, &stored_payload);

        Ok(lsn)
    }

    fn maybe_compress(&self, payload: &[u8]) -> Result<(Vec<u8>, bool), SafekeeperError> {
        if !self.config.compression_enabled {
            return Ok((payload.to_vec(), false));
        }
        let (compressed, ratio) = sk_codec::compress(payload)
            .map_err(|e| SafekeeperError::StorageIo(io::Error::new(io::ErrorKind::Other, e.to_string())))?;
        *self.last_compression_ratio.lock() = Some(ratio);
        Ok((compressed, true))
    }

    fn fan_out(&self, lsn: Lsn, payload: &[u8], is_compressed: bool, space_id: u32, page_no: u32, term: u64) {
        let req = ReplicateWalRequest {
            lsn,
            wal_data: payload.to_vec(),
            space_id,
            page_no,
            is_compressed,
            term,
        };
        for peer in self.membership.get_peers() {
            let client = self.peer_client.clone();
            let req = req.clone();
            let pending = self.pending.clone();
            let peer_for_log = peer.clone();
            tokio::spawn(async move {
                match client.replicate_wal(&peer, &req).await {
                    Ok(_resp) => pending.ack(lsn, peer),
                    Err(err) => tracing::debug!(%err, peer = peer_for_log, "replicate_wal to peer failed"),
                }
            });
        }
    }

    /// §4.8: if a leader is cached, probes it via `get_metrics` to confirm
    /// it still self-reports `Leader` and returns its endpoint. Otherwise
    /// (or if the probe doesn't confirm it), scans every peer via
    /// `get_metrics`, caches whichever one reports itself as `Leader`, and
    /// returns its endpoint.
    async fn discover_leader(&self) -> Option<String> {
        let peers = self.membership.get_peers();

        if let Some(cached) = self.consensus.state.known_leader() {
            for peer in &peers {
                if let Ok(metrics) = self.peer_client.get_metrics(peer).await {
                    if metrics.replica_id == cached && metrics.state == "Leader" {
                        return Some(peer.clone());
                    }
                }
            }
        }

        for peer in &peers {
            if let Ok(metrics) = self.peer_client.get_metrics(peer).await {
                if metrics.state == "Leader" {
                    self.consensus.state.set_known_leader(Some(metrics.replica_id.clone()));
                    return Some(peer.clone());
                }
            }
        }
        None
    }

    async fn forward_to_leader(&self, leader: &str, record: &WalRecord) -> Result<Lsn, SafekeeperError> {
        let req = ReplicateWalRequest {
            lsn: record.lsn,
            wal_data: record.payload.clone(),
            space_id: record.space_id,
            page_no: record.page_no,
            is_compressed: false,
            term: record.term,
        };
        let resp = self.peer_client.replicate_wal(leader, &req).await?;
        Ok(resp.last_applied_lsn)
    }

    /// Apply a record replicated in from the leader (§4.7 receiving side).
    pub async fn receive_replicated(&self, req: ReplicateWalRequest) -> Result<Lsn, SafekeeperError> {
        self.consensus.state.observe_term(req.term);
        self.wal
            .append(req.lsn, &req.wal_data, req.is_compressed)
            .map_err(SafekeeperError::StorageIo)?;
        self.lsn_counter.advance_to(req.lsn);
        self.timelines.update_latest(sk_common::DEFAULT_TIMELINE_ID, req.lsn);
        self.maybe_backup(req.lsn, &req.wal_data);
        Ok(req.lsn)
    }
}
