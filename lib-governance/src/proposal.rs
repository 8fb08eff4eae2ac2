//! Proposal records and lifecycle state

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use lib_types::{IdentityId, ProposalId, TickHeight};

use crate::actions::GovernanceAction;

/// Proposal lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    /// Created; the voting delay has not elapsed yet
    Pending,

    /// The voting window is open
    Active,

    /// Canceled by the proposer or the engine authority (terminal)
    Canceled,

    /// The window closed without quorum, or against won (terminal)
    Defeated,

    /// Passed; awaiting queueing or execution
    Succeeded,

    /// Passed and queued behind the timelock
    Queued,

    /// Queued but not executed within the grace period (terminal)
    Expired,

    /// Executed (terminal)
    Executed,
}

/// Vote support, in Compound-Bravo order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteSupport {
    Against,
    For,
    Abstain,
}

/// Vote cast by one identity on one proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// The support expressed
    pub support: VoteSupport,

    /// Voting weight used, from the creation snapshot
    pub weight: u64,

    /// Tick height the vote arrived at
    pub cast_at: TickHeight,
}

/// Individual proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Content-addressed id
    pub id: ProposalId,

    /// Proposer identity
    pub proposer: IdentityId,

    /// Ordered privileged operations to replay on execution
    pub actions: Vec<GovernanceAction>,

    /// Human-readable description
    pub description: String,

    /// Tick height the proposal was created at
    pub created_at: TickHeight,

    /// First tick of the voting window
    pub vote_start: TickHeight,

    /// First tick after the voting window
    pub vote_end: TickHeight,

    /// Voting weights captured at creation; immutable afterwards
    pub snapshot: HashMap<IdentityId, u64>,

    /// Sum of all snapshot weights
    pub snapshot_total: u64,

    /// Participation required for the proposal to pass
    pub quorum_weight: u64,

    /// Weight voting for
    pub votes_for: u64,

    /// Weight voting against
    pub votes_against: u64,

    /// Weight abstaining
    pub votes_abstain: u64,

    /// Vote record per identity; one vote each, never overwritten
    pub votes: HashMap<IdentityId, VoteRecord>,

    /// Execution eta once queued behind the timelock
    pub queued_eta: Option<TickHeight>,

    /// Terminal cancel flag
    pub canceled: bool,

    /// Terminal executed flag
    pub executed: bool,
}

impl Proposal {
    /// Compute the lifecycle state at `height`.
    ///
    /// Quorum counts supporting and abstaining weight; a proposal passes
    /// when quorum is met and strictly more weight voted for than against.
    pub fn state(&self, height: TickHeight, execution_grace: TickHeight) -> ProposalState {
        if self.canceled {
            return ProposalState::Canceled;
        }
        if self.executed {
            return ProposalState::Executed;
        }
        if height < self.vote_start {
            return ProposalState::Pending;
        }
        if height < self.vote_end {
            return ProposalState::Active;
        }

        let participation = self.votes_for.saturating_add(self.votes_abstain);
        if participation < self.quorum_weight || self.votes_for <= self.votes_against {
            return ProposalState::Defeated;
        }

        match self.queued_eta {
            Some(eta) if height > eta.saturating_add(execution_grace) => ProposalState::Expired,
            Some(_) => ProposalState::Queued,
            None => ProposalState::Succeeded,
        }
    }

    /// Weight that has voted so far
    pub fn total_votes_cast(&self) -> u64 {
        self.votes_for
            .saturating_add(self.votes_against)
            .saturating_add(self.votes_abstain)
    }
}
