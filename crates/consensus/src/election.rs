//! Async drivers for the state machine in `state.rs`: the randomized
//! election timer and the leader heartbeat loop, grounded on the
//! `ElectionManager` shape but rebuilt around `sk-peer`'s HTTP/JSON RPCs
//! instead of an in-process transport.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use sk_common::rpc::{HeartbeatRequest, RequestVoteRequest};
use sk_common::{Lsn, ReplicaId, Term};
use sk_membership::MembershipRegistry;
use sk_peer::PeerClient;
use tokio_util::sync::CancellationToken;

use crate::state::ConsensusState;

/// Callback into whatever owns the WAL, so this crate never needs a
/// dependency on `sk-wal` just to read one counter.
pub trait LocalLog: Send + Sync {
    fn latest_lsn(&self) -> Lsn;
}

#[derive(Clone, Debug)]
pub struct ElectionConfig {
    pub election_timeout_min: Duration,
    pub election_timeout_max: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            election_timeout_min: Duration::from_millis(1500),
            election_timeout_max: Duration::from_millis(3000),
            heartbeat_interval: Duration::from_millis(1000),
        }
    }
}

pub struct ConsensusEngine {
    pub state: Arc<ConsensusState>,
    self_id: ReplicaId,
    membership: Arc<MembershipRegistry>,
    peer_client: Arc<PeerClient>,
    log: Arc<dyn LocalLog>,
    config: ElectionConfig,
}

impl ConsensusEngine {
    pub fn new(
        self_id: ReplicaId,
        membership: Arc<MembershipRegistry>,
        peer_client: Arc<PeerClient>,
        log: Arc<dyn LocalLog>,
        config: ElectionConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(ConsensusState::new()),
            self_id,
            membership,
            peer_client,
            log,
            config,
        })
    }

    fn random_timeout(&self) -> Duration {
        let min = self.config.election_timeout_min.as_millis() as u64;
        let max = self.config.election_timeout_max.as_millis() as u64;
        let ms = rand::thread_rng().gen_range(min..=max.max(min + 1));
        Duration::from_millis(ms)
    }

    /// Runs until `cancel` fires. Intended to be spawned as its own task.
    pub async fn run_election_timer(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            let timeout = self.random_timeout();
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(timeout) => {}
            }

            if self.state.is_leader() {
                continue;
            }
            if self.state.idle_for() >= timeout {
                self.clone().start_election().await;
            }
        }
    }

    /// Runs until `cancel` fires, sending heartbeats on every tick while
    /// (and only while) we're the leader.
    pub async fn run_heartbeat_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.heartbeat_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            if self.state.is_leader() {
                self.send_heartbeats().await;
            }
        }
    }

    async fn start_election(self: Arc<Self>) {
        let term = self.state.start_election(&self.self_id);
        let peers = self.membership.get_peers();
        let quorum = self.membership.quorum_size();
        tracing::info!(term, quorum, peer_count = peers.len(), "starting election");

        if self.tally_votes(term).await >= quorum {
            self.become_leader(term);
            return;
        }

        let req = RequestVoteRequest {
            term,
            candidate_id: self.self_id.clone(),
            last_log_lsn: self.log.latest_lsn(),
            last_log_term: term,
        };

        let mut handles = Vec::new();
        for peer in peers {
            let client = self.peer_client.clone();
            let req = req.clone();
            let peer_for_result = peer.clone();
            handles.push(tokio::spawn(async move {
                (peer_for_result, client.request_vote(&peer, &req).await)
            }));
        }

        for handle in handles {
            let Ok((peer, result)) = handle.await else { continue };
            match result {
                Ok(resp) => {
                    if self.state.observe_term(resp.term) {
                        return;
                    }
                    if resp.vote_granted {
                        if let Some(count) = self.state.record_vote(term, peer) {
                            if count >= quorum {
                                self.become_leader(term);
                                return;
                            }
                        }
                    }
                }
                Err(err) => tracing::debug!(%err, peer, "request_vote failed"),
            }
        }
    }

    /// Votes already tallied synchronously (self-vote); returns the running
    /// count so a lone replica can become leader without any RPCs.
    async fn tally_votes(&self, term: Term) -> usize {
        self.state.record_vote(term, self.self_id.clone()).unwrap_or(1)
    }

    fn become_leader(&self, term: Term) {
        if self.state.become_leader(term, &self.self_id) {
            tracing::info!(term, replica = %self.self_id, "elected leader");
        }
    }

    async fn send_heartbeats(&self) {
        let term = self.state.term();
        let req = HeartbeatRequest {
            term,
            leader_id: self.self_id.clone(),
            latest_lsn: self.log.latest_lsn(),
        };
        for peer in self.membership.get_peers() {
            let client = self.peer_client.clone();
            let req = req.clone();
            let state = self.state.clone();
            tokio::spawn(async move {
                match client.heartbeat(&peer, &req).await {
                    Ok(resp) => {
                        state.observe_term(resp.term);
                    }
                    Err(err) => tracing::debug!(%err, peer, "heartbeat failed"),
                }
            });
        }
    }

    /// Handle an incoming heartbeat from a peer claiming leadership.
    pub fn on_heartbeat(&self, req: &HeartbeatRequest) -> bool {
        self.state.observe_term(req.term);
        if req.term < self.state.term() {
            return false;
        }
        self.state.step_down_to_follower();
        self.state.set_known_leader(Some(req.leader_id.clone()));
        self.state.record_activity();
        true
    }
}
