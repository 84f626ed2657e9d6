use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub mod rpc;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Monotonically increasing log sequence number, unique per timeline.
pub type Lsn = u64;

/// Consensus term/epoch. Monotonically non-decreasing; at most one Leader
/// per term.
pub type Term = u64;

/// Stable replica identity, independent of the endpoint it is reachable at.
pub type ReplicaId = String;

/// Unique timeline (branch) identifier.
pub type TimelineId = String;

/// Name of the root timeline created at startup if absent.
pub const DEFAULT_TIMELINE_ID: &str = "default";

// ---------------------------------------------------------------------------
// WAL record — the unit of replication
// ---------------------------------------------------------------------------

/// Opaque write-ahead-log record streamed in by compute. The core never
/// interprets `payload`; `space_id`/`page_no` are hints for downstream
/// readers only.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalRecord {
    pub lsn: Lsn,
    pub payload: Vec<u8>,
    pub space_id: u32,
    pub page_no: u32,
    /// Consensus term at which the record was accepted by the leader that
    /// wrote it.
    pub term: Term,
}

// ---------------------------------------------------------------------------
// Replica role — tagged variant per the design notes (§9)
// ---------------------------------------------------------------------------

/// Replica role as a sum type. All transitions go through
/// `sk-consensus::RoleState::transition_*`, which enforces "term never
/// decreases; on term-up, drop to Follower".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    Follower { term: Term },
    Candidate { term: Term, votes_received: HashSet<ReplicaId> },
    Leader { term: Term },
}

impl Role {
    pub fn term(&self) -> Term {
        match self {
            Role::Follower { term } => *term,
            Role::Candidate { term, .. } => *term,
            Role::Leader { term } => *term,
        }
    }

    pub fn is_leader(&self) -> bool {
        matches!(self, Role::Leader { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Follower { .. } => "Follower",
            Role::Candidate { .. } => "Candidate",
            Role::Leader { .. } => "Leader",
        }
    }
}

// ---------------------------------------------------------------------------
// Timeline — a named, parented branch of the LSN sequence (§3, §4.3)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timeline {
    pub id: TimelineId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub parent_lsn: Lsn,
    pub parent_timeline_id: TimelineId,
    pub latest_lsn: Lsn,
}

impl Timeline {
    /// A brand-new root timeline with no parent.
    pub fn root(id: TimelineId, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            id,
            created_at: now,
            parent_lsn: 0,
            parent_timeline_id: String::new(),
            latest_lsn: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types (§7)
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SafekeeperError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),

    #[error("higher term observed: {0}")]
    HigherTermObserved(Term),

    #[error("quorum not reached within timeout")]
    QuorumNotReached,

    #[error("method not allowed")]
    MethodNotAllowed,
}

impl SafekeeperError {
    /// Short machine-readable kind, used both for logging and for the
    /// `error` field of JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            SafekeeperError::Unauthenticated => "unauthenticated",
            SafekeeperError::BadRequest(_) => "bad_request",
            SafekeeperError::NotFound(_) => "not_found",
            SafekeeperError::AlreadyExists(_) => "already_exists",
            SafekeeperError::StorageIo(_) => "storage_io",
            SafekeeperError::PeerUnreachable(_) => "peer_unreachable",
            SafekeeperError::HigherTermObserved(_) => "higher_term_observed",
            SafekeeperError::QuorumNotReached => "quorum_not_reached",
            SafekeeperError::MethodNotAllowed => "method_not_allowed",
        }
    }
}

// ---------------------------------------------------------------------------
// Membership (§3, §4.4)
// ---------------------------------------------------------------------------

/// Derive quorum size (including self) from the number of peers.
pub fn quorum_size(peer_count: usize) -> usize {
    (peer_count + 1) / 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_size_matches_majority() {
        assert_eq!(quorum_size(0), 1);
        assert_eq!(quorum_size(1), 2);
        assert_eq!(quorum_size(2), 2);
        assert_eq!(quorum_size(3), 3);
        assert_eq!(quorum_size(4), 3);
    }

    #[test]
    fn role_term_and_label() {
        let r = Role::Candidate { term: 5, votes_received: HashSet::new() };
        assert_eq!(r.term(), 5);
        assert_eq!(r.label(), "Candidate");
        assert!(!r.is_leader());
    }
}
