//! Governance Errors

use thiserror::Error;
use lib_types::{IdentityId, ProposalId, TickHeight};

use crate::proposal::ProposalState;

/// Error during governance operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("Proposal already exists: {0}")]
    DuplicateProposal(ProposalId),

    #[error("Proposer weight {weight} below threshold {threshold}")]
    BelowProposalThreshold { weight: u64, threshold: u64 },

    #[error("A proposal needs at least one action")]
    EmptyActions,

    #[error("Voting is not open: proposal is {0:?}")]
    VotingClosed(ProposalState),

    #[error("Identity has already voted: {0}")]
    AlreadyVoted(IdentityId),

    #[error("Identity has no voting power in the snapshot: {0}")]
    NoVotingPower(IdentityId),

    #[error("Proposal is not in the required state: {0:?}")]
    InvalidProposalState(ProposalState),

    #[error("Timelock has not expired: eta={eta}, height={height}")]
    TimelockNotExpired { eta: TickHeight, height: TickHeight },

    #[error("No timelock is configured")]
    NoTimelock,

    #[error("Caller is not the proposer or the engine authority")]
    NotAuthorized,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Canonical encoding failed: {0}")]
    Encoding(String),
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;
