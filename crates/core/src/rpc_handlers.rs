//! Inbound-RPC glue: turns the wire DTOs into calls against the consensus
//! state machine. The axum handlers in the binary crate call straight
//! through these.

use sk_common::rpc::{HeartbeatRequest, HeartbeatResponse, RequestVoteRequest, RequestVoteResponse};

use crate::engine::Engine;

impl Engine {
    pub fn handle_vote_request(&self, req: &RequestVoteRequest) -> RequestVoteResponse {
        let local_latest_lsn = self.lsn_counter.get();
        let (term, vote_granted) = self.consensus.state.handle_vote_request(req, local_latest_lsn);
        RequestVoteResponse { term, vote_granted }
    }

    pub fn handle_heartbeat(&self, req: &HeartbeatRequest) -> HeartbeatResponse {
        self.consensus.on_heartbeat(req);
        HeartbeatResponse { status: "ok".to_string(), term: self.consensus.state.term() }
    }
}
