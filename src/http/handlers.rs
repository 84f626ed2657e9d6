use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use sk_common::rpc::{
    CreateTimelineRequest, GetLatestLsnResponse, GetTimelineResponse, GetTimelinesResponse,
    GetWalRangeResponse, GetWalResponse, HeartbeatRequest, HeartbeatResponse, MembershipResponse,
    MetricsResponse, PeerEndpointRequest, PingResponse, RecoverFromPeerResponse,
    RecoverTimelineRequest, ReplicateWalRequest, RequestVoteRequest, RequestVoteResponse,
    StatusResponse, StreamWalResponse, WalEntry,
};
use sk_common::WalRecord;

use crate::http::error::ApiError;
use crate::http::AppState;

pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        state: state.engine.metrics().state,
    })
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.engine.metrics())
}

pub async fn stream_wal(
    State(state): State<AppState>,
    Json(req): Json<ReplicateWalRequest>,
) -> Result<Json<StreamWalResponse>, ApiError> {
    let record = WalRecord {
        lsn: req.lsn,
        payload: req.wal_data,
        space_id: req.space_id,
        page_no: req.page_no,
        term: req.term,
    };
    let lsn = state.engine.propose(record).await?;
    Ok(Json(StreamWalResponse { status: "ok".to_string(), last_applied_lsn: lsn }))
}

pub async fn replicate_wal(
    State(state): State<AppState>,
    Json(req): Json<ReplicateWalRequest>,
) -> Result<Json<StreamWalResponse>, ApiError> {
    let lsn = state.engine.receive_replicated(req).await?;
    Ok(Json(StreamWalResponse { status: "ok".to_string(), last_applied_lsn: lsn }))
}

#[derive(Deserialize)]
pub struct GetWalQuery {
    pub lsn: u64,
}

pub async fn get_wal(
    State(state): State<AppState>,
    Query(q): Query<GetWalQuery>,
) -> Result<Json<GetWalResponse>, ApiError> {
    let payload = state
        .engine
        .read_wal(q.lsn)?
        .ok_or_else(|| ApiError(sk_common::SafekeeperError::NotFound(format!("lsn {}", q.lsn))))?;
    Ok(Json(GetWalResponse { status: "ok".to_string(), lsn: q.lsn, wal_data: payload }))
}

pub async fn get_latest_lsn(State(state): State<AppState>) -> Json<GetLatestLsnResponse> {
    Json(GetLatestLsnResponse { status: "ok".to_string(), latest_lsn: state.engine.latest_lsn() })
}

#[derive(Deserialize)]
pub struct WalRangeQuery {
    pub start_lsn: u64,
    pub end_lsn: u64,
}

const MAX_WAL_RANGE: u64 = 1000;

pub async fn get_wal_range(
    State(state): State<AppState>,
    Query(q): Query<WalRangeQuery>,
) -> Result<Json<GetWalRangeResponse>, ApiError> {
    if q.end_lsn < q.start_lsn || q.end_lsn - q.start_lsn + 1 > MAX_WAL_RANGE {
        return Err(ApiError(sk_common::SafekeeperError::BadRequest(format!(
            "range must cover at most {MAX_WAL_RANGE} LSNs"
        ))));
    }
    let entries = state.engine.read_wal_range(q.start_lsn, q.end_lsn)?;
    let wals = entries
        .into_iter()
        .map(|(lsn, wal_data)| WalEntry { lsn, wal_data, space_id: 0, page_no: 0 })
        .collect();
    Ok(Json(GetWalRangeResponse { status: "ok".to_string(), wals }))
}

pub async fn request_vote(
    State(state): State<AppState>,
    Json(req): Json<RequestVoteRequest>,
) -> Json<RequestVoteResponse> {
    Json(state.engine.handle_vote_request(&req))
}

pub async fn heartbeat(
    State(state): State<AppState>,
    Json(req): Json<HeartbeatRequest>,
) -> Json<HeartbeatResponse> {
    Json(state.engine.handle_heartbeat(&req))
}

pub async fn get_timelines(State(state): State<AppState>) -> Json<GetTimelinesResponse> {
    Json(GetTimelinesResponse { status: "ok".to_string(), timelines: state.engine.list_timelines() })
}

pub async fn get_timeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GetTimelineResponse>, ApiError> {
    let timeline = state
        .engine
        .get_timeline(&id)
        .ok_or_else(|| ApiError(sk_common::SafekeeperError::NotFound(format!("timeline {id}"))))?;
    Ok(Json(GetTimelineResponse { status: "ok".to_string(), timeline }))
}

pub async fn create_timeline(
    State(state): State<AppState>,
    Json(req): Json<CreateTimelineRequest>,
) -> Result<Json<GetTimelineResponse>, ApiError> {
    let timeline = state
        .engine
        .create_timeline(req.timeline_id, req.parent_lsn, req.parent_timeline_id)?;
    Ok(Json(GetTimelineResponse { status: "ok".to_string(), timeline }))
}

pub async fn add_peer(
    State(state): State<AppState>,
    Json(req): Json<PeerEndpointRequest>,
) -> Json<MembershipResponse> {
    state.engine.add_peer(req.peer_endpoint);
    Json(MembershipResponse {
        status: "ok".to_string(),
        peer_count: state.engine.peer_count(),
        quorum_size: state.engine.quorum_size(),
    })
}

pub async fn remove_peer(
    State(state): State<AppState>,
    Json(req): Json<PeerEndpointRequest>,
) -> Json<MembershipResponse> {
    state.engine.remove_peer(&req.peer_endpoint);
    Json(MembershipResponse {
        status: "ok".to_string(),
        peer_count: state.engine.peer_count(),
        quorum_size: state.engine.quorum_size(),
    })
}

pub async fn recover_from_peer(
    State(state): State<AppState>,
    Json(req): Json<PeerEndpointRequest>,
) -> Result<Json<RecoverFromPeerResponse>, ApiError> {
    let latest = state.engine.recover_from_peer(&req.peer_endpoint).await?;
    Ok(Json(RecoverFromPeerResponse {
        status: "ok".to_string(),
        message: format!("recovered up to lsn {latest} from {}", req.peer_endpoint),
    }))
}

pub async fn recover_timeline(
    State(state): State<AppState>,
    Json(req): Json<RecoverTimelineRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.engine.recover_timeline(&req.timeline_id, &req.peer_endpoints).await?;
    Ok(Json(StatusResponse { status: "ok".to_string() }))
}
