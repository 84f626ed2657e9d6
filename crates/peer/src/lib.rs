//! §4.5 peer RPC client: a typed wrapper over HTTP/JSON with a short
//! per-call timeout to every other replica. All transport errors surface as
//! `peer_unreachable`; callers decide whether that's fatal.

use std::time::Duration;

use reqwest::Client;
use sk_common::rpc::{
    GetLatestLsnResponse, GetTimelineResponse, GetTimelinesResponse, GetWalRangeResponse,
    HeartbeatRequest, HeartbeatResponse, MetricsResponse, ReplicateWalRequest,
    RequestVoteRequest, RequestVoteResponse, StreamWalResponse,
};
use sk_common::SafekeeperError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PeerClient {
    http: Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builds with static config");
        Self { http }
    }

    fn unreachable(endpoint: &str, err: reqwest::Error) -> SafekeeperError {
        SafekeeperError::PeerUnreachable(format!("{endpoint}: {err}"))
    }

    pub async fn replicate_wal(
        &self,
        endpoint: &str,
        req: &ReplicateWalRequest,
    ) -> Result<StreamWalResponse, SafekeeperError> {
        let url = format!("{endpoint}/api/v1/replicate_wal");
        self.http
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))?
            .json()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))
    }

    pub async fn request_vote(
        &self,
        endpoint: &str,
        req: &RequestVoteRequest,
    ) -> Result<RequestVoteResponse, SafekeeperError> {
        let url = format!("{endpoint}/api/v1/request_vote");
        self.http
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))?
            .json()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))
    }

    pub async fn heartbeat(
        &self,
        endpoint: &str,
        req: &HeartbeatRequest,
    ) -> Result<HeartbeatResponse, SafekeeperError> {
        let url = format!("{endpoint}/api/v1/heartbeat");
        self.http
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))?
            .json()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))
    }

    pub async fn get_latest_lsn(&self, endpoint: &str) -> Result<GetLatestLsnResponse, SafekeeperError> {
        let url = format!("{endpoint}/api/v1/get_latest_lsn");
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))?
            .json()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))
    }

    pub async fn get_metrics(&self, endpoint: &str) -> Result<MetricsResponse, SafekeeperError> {
        let url = format!("{endpoint}/api/v1/metrics");
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))?
            .json()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))
    }

    pub async fn get_timelines(&self, endpoint: &str) -> Result<GetTimelinesResponse, SafekeeperError> {
        let url = format!("{endpoint}/api/v1/timelines");
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))?
            .json()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))
    }

    pub async fn get_timeline(
        &self,
        endpoint: &str,
        id: &str,
    ) -> Result<GetTimelineResponse, SafekeeperError> {
        let url = format!("{endpoint}/api/v1/timelines/{id}");
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))?
            .json()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))
    }

    pub async fn get_wal_range(
        &self,
        endpoint: &str,
        start: u64,
        end: u64,
    ) -> Result<GetWalRangeResponse, SafekeeperError> {
        let url = format!("{endpoint}/api/v1/get_wal_range?start_lsn={start}&end_lsn={end}");
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))?
            .json()
            .await
            .map_err(|e| Self::unreachable(endpoint, e))
    }
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new()
    }
}
