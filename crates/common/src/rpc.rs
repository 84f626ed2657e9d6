//! Wire-level request/response shapes for the peer RPC surface (§4.5, §6).
//! Shared between the HTTP server (`safekeeper` binary) and the peer client
//! (`sk-peer`) so both sides agree on field names without duplicating the
//! structs.

use serde::{Deserialize, Serialize};

use crate::{Lsn, ReplicaId, Term, Timeline};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateWalRequest {
    pub lsn: Lsn,
    #[serde(with = "base64_bytes")]
    pub wal_data: Vec<u8>,
    #[serde(default)]
    pub space_id: u32,
    #[serde(default)]
    pub page_no: u32,
    #[serde(default)]
    pub is_compressed: bool,
    pub term: Term,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamWalResponse {
    pub status: String,
    pub last_applied_lsn: Lsn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestVoteRequest {
    pub term: Term,
    pub candidate_id: ReplicaId,
    pub last_log_lsn: Lsn,
    pub last_log_term: Term,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestVoteResponse {
    pub term: Term,
    pub vote_granted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub term: Term,
    pub leader_id: ReplicaId,
    pub latest_lsn: Lsn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub status: String,
    pub term: Term,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
    pub version: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetLatestLsnResponse {
    pub status: String,
    pub latest_lsn: Lsn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub replica_id: ReplicaId,
    pub state: String,
    pub term: Term,
    pub latest_lsn: Lsn,
    pub wal_count: u64,
    pub quorum_size: usize,
    pub peer_count: usize,
    pub compression_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    pub timeline_count: usize,
    pub default_timeline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTimelinesResponse {
    pub status: String,
    pub timelines: Vec<Timeline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTimelineResponse {
    pub status: String,
    pub timeline: Timeline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    pub lsn: Lsn,
    #[serde(with = "base64_bytes")]
    pub wal_data: Vec<u8>,
    pub space_id: u32,
    pub page_no: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWalRangeResponse {
    pub status: String,
    pub wals: Vec<WalEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWalResponse {
    pub status: String,
    pub lsn: Lsn,
    #[serde(with = "base64_bytes")]
    pub wal_data: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTimelineRequest {
    pub timeline_id: crate::TimelineId,
    #[serde(default)]
    pub parent_lsn: Option<Lsn>,
    #[serde(default)]
    pub parent_timeline_id: Option<crate::TimelineId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerEndpointRequest {
    pub peer_endpoint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipResponse {
    pub status: String,
    pub peer_count: usize,
    pub quorum_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoverFromPeerResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoverTimelineRequest {
    pub timeline_id: crate::TimelineId,
    pub peer_endpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Serde helper: (de)serialize `Vec<u8>` fields as base64 strings, matching
/// §6 "Responses are JSON except get_wal/get_wal_range which base64-encode
/// payloads" — applied uniformly here since every payload-bearing field on
/// the wire is base64, including in requests.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
