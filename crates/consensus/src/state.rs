//! Pure consensus state: role, term, and the vote-granting rule (§4.6).
//! Kept free of I/O so the transition rules can be unit-tested without a
//! runtime.

use std::collections::HashSet;
use std::time::Instant;

use parking_lot::RwLock;
use sk_common::rpc::RequestVoteRequest;
use sk_common::{Lsn, ReplicaId, Role, Term};

/// `role` and `term` share one lock (they always change together); every
/// other field gets its own lock per the no-nested-locking policy.
pub struct ConsensusState {
    role: RwLock<Role>,
    voted_for: RwLock<Option<(Term, ReplicaId)>>,
    known_leader: RwLock<Option<ReplicaId>>,
    last_activity: RwLock<Instant>,
}

impl ConsensusState {
    pub fn new() -> Self {
        Self {
            role: RwLock::new(Role::Follower { term: 1 }),
            voted_for: RwLock::new(None),
            known_leader: RwLock::new(None),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    pub fn term(&self) -> Term {
        self.role.read().term()
    }

    pub fn role_label(&self) -> &'static str {
        self.role.read().label()
    }

    pub fn is_leader(&self) -> bool {
        self.role.read().is_leader()
    }

    pub fn known_leader(&self) -> Option<ReplicaId> {
        self.known_leader.read().clone()
    }

    pub fn set_known_leader(&self, leader: Option<ReplicaId>) {
        *self.known_leader.write() = leader;
    }

    pub fn record_activity(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.read().elapsed()
    }

    /// Term never decreases; observing a higher term always drops us to
    /// Follower, regardless of current role. Returns true if we stepped down.
    pub fn observe_term(&self, observed: Term) -> bool {
        let mut role = self.role.write();
        if observed > role.term() {
            *role = Role::Follower { term: observed };
            *self.voted_for.write() = None;
            *self.known_leader.write() = None;
            true
        } else {
            false
        }
    }

    /// Bump our own term and become a Candidate voting for ourselves.
    pub fn start_election(&self, self_id: &ReplicaId) -> Term {
        let mut role = self.role.write();
        let new_term = role.term() + 1;
        let mut votes = HashSet::new();
        votes.insert(self_id.clone());
        *role = Role::Candidate { term: new_term, votes_received: votes };
        drop(role);
        *self.voted_for.write() = Some((new_term, self_id.clone()));
        *self.known_leader.write() = None;
        self.record_activity();
        new_term
    }

    /// Record a vote granted by `voter` for the term we're currently
    /// candidating in. Returns the current vote count if still a Candidate
    /// in that term, `None` otherwise (role already moved on).
    pub fn record_vote(&self, term: Term, voter: ReplicaId) -> Option<usize> {
        let mut role = self.role.write();
        match &mut *role {
            Role::Candidate { term: cur_term, votes_received } if *cur_term == term => {
                votes_received.insert(voter);
                Some(votes_received.len())
            }
            _ => None,
        }
    }

    /// Promote a Candidate to Leader, provided we're still candidating in
    /// `term`. No-op (returns false) if the role has since moved on.
    pub fn become_leader(&self, term: Term, self_id: &ReplicaId) -> bool {
        let mut role = self.role.write();
        match &*role {
            Role::Candidate { term: cur_term, .. } if *cur_term == term => {
                *role = Role::Leader { term };
                drop(role);
                *self.known_leader.write() = Some(self_id.clone());
                true
            }
            _ => false,
        }
    }

    pub fn step_down_to_follower(&self) {
        let mut role = self.role.write();
        *role = Role::Follower { term: role.term() };
    }

    /// §4.6 vote-granting rule: term must not be stale, we must not have
    /// already voted for someone else this term, and the candidate's log
    /// must be at least as up to date as ours.
    pub fn handle_vote_request(
        &self,
        req: &RequestVoteRequest,
        local_latest_lsn: Lsn,
    ) -> (Term, bool) {
        self.observe_term(req.term);

        let current_term = self.term();
        if req.term < current_term {
            return (current_term, false);
        }

        let mut voted_for = self.voted_for.write();
        if let Some((term, candidate)) = voted_for.as_ref() {
            if *term == req.term && candidate != &req.candidate_id {
                return (current_term, false);
            }
        }

        if req.last_log_lsn < local_latest_lsn {
            return (current_term, false);
        }

        *voted_for = Some((req.term, req.candidate_id.clone()));
        drop(voted_for);
        self.record_activity();
        (current_term, true)
    }
}

impl Default for ConsensusState {
    fn default() -> Self {
        Self::new()
    }
}
