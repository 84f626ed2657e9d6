//! The orchestrating engine: wires the WAL store, timeline/membership
//! registries, peer client, consensus engine, and cold backup together,
//! playing the same role the teacher's `StorageEngine` played for a single
//! page store — generalized to a replicated one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sk_backup::{BlobStore, FsBlobStore};
use sk_common::{Lsn, ReplicaId, SafekeeperError, Timeline, TimelineId};
use sk_consensus::election::{ConsensusEngine, ElectionConfig};
use sk_membership::MembershipRegistry;
use sk_peer::PeerClient;
use sk_timeline::TimelineRegistry;
use sk_wal::WalLogStore;
use tokio_util::sync::CancellationToken;

use crate::lsn_counter::LsnCounter;
use crate::pending::PendingTable;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub replica_id: ReplicaId,
    pub wal_dir: PathBuf,
    pub backup_dir: Option<PathBuf>,
    pub peers: Vec<String>,
    pub compression_enabled: bool,
    pub quorum_timeout: Duration,
    pub election: ElectionConfig,
}

pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) wal: WalLogStore,
    pub(crate) timelines: TimelineRegistry,
    pub(crate) membership: Arc<MembershipRegistry>,
    pub(crate) peer_client: Arc<PeerClient>,
    pub(crate) consensus: Arc<ConsensusEngine>,
    pub(crate) backup: Option<Arc<dyn BlobStore>>,
    pub(crate) pending: Arc<PendingTable>,
    pub(crate) lsn_counter: LsnCounter,
    pub(crate) last_compression_ratio: Mutex<Option<f64>>,
}

impl Engine {
    pub async fn open(config: EngineConfig) -> Result<Arc<Self>, SafekeeperError> {
        let (wal, recovered_latest) = WalLogStore::open(&config.wal_dir)?;

        let timelines = TimelineRegistry::new();
        timelines.update_latest(sk_common::DEFAULT_TIMELINE_ID, recovered_latest);

        let membership = Arc::new(MembershipRegistry::new(config.peers.clone()));
        let peer_client = Arc::new(PeerClient::new());
        let lsn_counter = LsnCounter::new(recovered_latest);

        let consensus = ConsensusEngine::new(
            config.replica_id.clone(),
            membership.clone(),
            peer_client.clone(),
            Arc::new(lsn_counter.clone()),
            config.election.clone(),
        );

        let backup: Option<Arc<dyn BlobStore>> = match &config.backup_dir {
            Some(dir) => Some(Arc::new(FsBlobStore::new(dir.clone()).await.map_err(|e| {
                SafekeeperError::StorageIo(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            })?)),
            None => None,
        };

        Ok(Arc::new(Self {
            config,
            wal,
            timelines,
            membership,
            peer_client,
            consensus,
            backup,
            pending: Arc::new(PendingTable::new()),
            lsn_counter,
            last_compression_ratio: Mutex::new(None),
        }))
    }

    /// Spawns the election timer and heartbeat loop; returns their handles
    /// so the caller can join them on shutdown.
    pub fn spawn_consensus_tasks(self: &Arc<Self>, cancel: CancellationToken) {
        tokio::spawn(self.consensus.clone().run_election_timer(cancel.clone()));
        tokio::spawn(self.consensus.clone().run_heartbeat_loop(cancel));
    }

    pub fn replica_id(&self) -> &ReplicaId {
        &self.config.replica_id
    }

    pub fn is_leader(&self) -> bool {
        self.consensus.state.is_leader()
    }

    pub fn known_leader(&self) -> Option<ReplicaId> {
        self.consensus.state.known_leader()
    }

    pub fn latest_lsn(&self) -> Lsn {
        self.lsn_counter.get()
    }

    /// Returns the record's original (decompressed) payload, regardless of
    /// how it's stored on disk — callers never see the codec applied.
    pub fn read_wal(&self, lsn: Lsn) -> Result<Option<Vec<u8>>, SafekeeperError> {
        let Some((payload, is_compressed)) = self.wal.read(lsn).map_err(SafekeeperError::StorageIo)? else {
            return Ok(None);
        };
        Ok(Some(decompress_if_needed(payload, is_compressed)?))
    }

    pub fn read_wal_range(&self, start: Lsn, end: Lsn) -> Result<Vec<(Lsn, Vec<u8>)>, SafekeeperError> {
        let entries = self.wal.read_range(start, end).map_err(SafekeeperError::StorageIo)?;
        entries
            .into_iter()
            .map(|(lsn, payload, is_compressed)| Ok((lsn, decompress_if_needed(payload, is_compressed)?)))
            .collect()
    }

    pub fn get_timeline(&self, id: &str) -> Option<Timeline> {
        self.timelines.get(id)
    }

    pub fn list_timelines(&self) -> Vec<Timeline> {
        self.timelines.list()
    }

    pub fn create_branch(
        &self,
        new_id: TimelineId,
        from_id: &str,
        at_lsn: Lsn,
    ) -> Result<Timeline, SafekeeperError> {
        self.timelines.branch(new_id, from_id, at_lsn)
    }

    pub fn create_timeline(
        &self,
        id: TimelineId,
        parent_lsn: Option<Lsn>,
        parent_timeline_id: Option<TimelineId>,
    ) -> Result<Timeline, SafekeeperError> {
        self.timelines.create(
            id,
            parent_lsn.unwrap_or(0),
            parent_timeline_id.unwrap_or_else(|| sk_common::DEFAULT_TIMELINE_ID.to_string()),
        )
    }

    pub fn add_peer(&self, endpoint: String) {
        self.membership.add_peer(endpoint);
    }

    pub fn remove_peer(&self, endpoint: &str) {
        self.membership.remove_peer(endpoint);
    }

    pub fn peer_count(&self) -> usize {
        self.membership.peer_count()
    }

    pub fn quorum_size(&self) -> usize {
        self.membership.quorum_size()
    }

    pub(crate) fn maybe_backup(&self, lsn: Lsn, payload: &[u8]) {
        let Some(backup) = self.backup.clone() else { return };
        let payload = payload.to_vec();
        tokio::spawn(async move {
            let key = sk_backup::blob_key(lsn);
            if let Err(err) = backup.put(&key, payload).await {
                tracing::warn!(%err, lsn, "cold backup put failed");
            }
        });
    }
}

fn decompress_if_needed(payload: Vec<u8>, is_compressed: bool) -> Result<Vec<u8>, SafekeeperError> {
    if !is_compressed {
        return Ok(payload);
    }
    sk_codec::decompress(&payload)
        .map_err(|e| SafekeeperError::StorageIo(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))
}
