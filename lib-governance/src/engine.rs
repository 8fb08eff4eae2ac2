//! Governor engine
//!
//! Holds proposal records and drives the vote/queue/execute lifecycle.
//! The engine never touches the admission controller itself; execution is
//! two-phase so the caller can apply the action list atomically and report
//! back.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use lib_crypto::hashing::{hash_blake3, hash_blake3_multiple};
use lib_types::{Bps, IdentityId, ProposalId, TickHeight};

use crate::actions::GovernanceAction;
use crate::errors::{GovernanceError, GovernanceResult};
use crate::proposal::{Proposal, ProposalState, VoteRecord, VoteSupport};

/// Share denominator for quorum basis points
const BPS_DENOMINATOR: u64 = 10_000;

/// Governance timing and threshold parameters.
///
/// All heights are opaque ticks; the caller owns the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ticks between proposal creation and the voting window opening
    pub voting_delay: TickHeight,

    /// Length of the voting window in ticks
    pub voting_period: TickHeight,

    /// Minimum snapshot weight required to create a proposal
    pub proposal_threshold: u64,

    /// Participation required to pass, in basis points of the snapshot
    /// total voting weight
    pub quorum_bps: Bps,

    /// Optional timelock between success and execution
    pub timelock_delay: Option<TickHeight>,

    /// Ticks past the eta a queued proposal stays executable
    pub execution_grace: TickHeight,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            voting_delay: 1,
            voting_period: 100,
            proposal_threshold: 1,
            quorum_bps: 3_000,
            timelock_delay: None,
            execution_grace: 1_000,
        }
    }
}

/// Governance engine over one admission-controller instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorEngine {
    /// Timing and threshold parameters
    config: EngineConfig,

    /// Identity allowed to cancel any live proposal
    authority: IdentityId,

    /// All proposals by content id
    proposals: HashMap<ProposalId, Proposal>,
}

impl GovernorEngine {
    pub fn new(config: EngineConfig, authority: IdentityId) -> Self {
        Self {
            config,
            authority,
            proposals: HashMap::new(),
        }
    }

    /// Content-address a proposal: the hash of the canonical action
    /// encoding and the description hash.
    pub fn proposal_id(
        actions: &[GovernanceAction],
        description: &str,
    ) -> GovernanceResult<ProposalId> {
        let encoded = serde_json::to_vec(actions)
            .map_err(|e| GovernanceError::Encoding(e.to_string()))?;
        let description_hash = hash_blake3(description.as_bytes());
        Ok(ProposalId::new(hash_blake3_multiple(&[
            &encoded,
            &description_hash,
        ])))
    }

    // ========================================================================
    // PROPOSAL CREATION
    // ========================================================================

    /// Create a proposal.
    ///
    /// The voting-power snapshot is captured here and never changes for
    /// the life of the proposal; identities acquiring slots later cannot
    /// vote on it.
    ///
    /// # Errors
    ///
    /// - `EmptyActions` for an action-less proposal
    /// - `BelowProposalThreshold` if the proposer's snapshot weight is
    ///   under the configured threshold
    /// - `DuplicateProposal` if the same actions and description are
    ///   already proposed
    pub fn propose(
        &mut self,
        proposer: IdentityId,
        actions: Vec<GovernanceAction>,
        description: &str,
        snapshot: HashMap<IdentityId, u64>,
        height: TickHeight,
    ) -> GovernanceResult<ProposalId> {
        if actions.is_empty() {
            return Err(GovernanceError::EmptyActions);
        }

        let weight = snapshot.get(&proposer).copied().unwrap_or(0);
        if weight < self.config.proposal_threshold {
            return Err(GovernanceError::BelowProposalThreshold {
                weight,
                threshold: self.config.proposal_threshold,
            });
        }

        let id = Self::proposal_id(&actions, description)?;
        if self.proposals.contains_key(&id) {
            return Err(GovernanceError::DuplicateProposal(id));
        }

        let mut snapshot_total: u64 = 0;
        for w in snapshot.values() {
            snapshot_total = snapshot_total
                .checked_add(*w)
                .ok_or(GovernanceError::Overflow)?;
        }
        let quorum_weight =
            ((snapshot_total as u128 * self.config.quorum_bps as u128) / BPS_DENOMINATOR as u128) as u64;

        let vote_start = height
            .checked_add(self.config.voting_delay)
            .ok_or(GovernanceError::Overflow)?;
        let vote_end = vote_start
            .checked_add(self.config.voting_period)
            .ok_or(GovernanceError::Overflow)?;

        let proposal = Proposal {
            id,
            proposer,
            actions,
            description: description.to_string(),
            created_at: height,
            vote_start,
            vote_end,
            snapshot,
            snapshot_total,
            quorum_weight,
            votes_for: 0,
            votes_against: 0,
            votes_abstain: 0,
            votes: HashMap::new(),
            queued_eta: None,
            canceled: false,
            executed: false,
        };
        self.proposals.insert(id, proposal);
        Ok(id)
    }

    // ========================================================================
    // VOTING
    // ========================================================================

    /// Cast a vote.
    ///
    /// Weight comes from the creation snapshot. One vote per identity per
    /// proposal; overwriting is not allowed once cast.
    ///
    /// # Errors
    ///
    /// - `ProposalNotFound`
    /// - `VotingClosed` outside the Active window
    /// - `NoVotingPower` for identities absent from the snapshot
    /// - `AlreadyVoted` on a second attempt
    pub fn cast_vote(
        &mut self,
        id: ProposalId,
        voter: IdentityId,
        support: VoteSupport,
        height: TickHeight,
    ) -> GovernanceResult<()> {
        let grace = self.config.execution_grace;
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        let state = proposal.state(height, grace);
        if state != ProposalState::Active {
            return Err(GovernanceError::VotingClosed(state));
        }

        let weight = proposal
            .snapshot
            .get(&voter)
            .copied()
            .ok_or(GovernanceError::NoVotingPower(voter))?;

        if proposal.votes.contains_key(&voter) {
            return Err(GovernanceError::AlreadyVoted(voter));
        }

        match support {
            VoteSupport::For => {
                proposal.votes_for = proposal
                    .votes_for
                    .checked_add(weight)
                    .ok_or(GovernanceError::Overflow)?;
            }
            VoteSupport::Against => {
                proposal.votes_against = proposal
                    .votes_against
                    .checked_add(weight)
                    .ok_or(GovernanceError::Overflow)?;
            }
            VoteSupport::Abstain => {
                proposal.votes_abstain = proposal
                    .votes_abstain
                    .checked_add(weight)
                    .ok_or(GovernanceError::Overflow)?;
            }
        }

        proposal.votes.insert(
            voter,
            VoteRecord {
                support,
                weight,
                cast_at: height,
            },
        );
        Ok(())
    }

    // ========================================================================
    // QUEUE AND EXECUTE
    // ========================================================================

    /// Queue a succeeded proposal behind the timelock.
    ///
    /// # Errors
    ///
    /// - `NoTimelock` when the engine runs without one
    /// - `InvalidProposalState` unless the proposal is Succeeded
    pub fn queue(&mut self, id: ProposalId, height: TickHeight) -> GovernanceResult<TickHeight> {
        let delay = self
            .config
            .timelock_delay
            .ok_or(GovernanceError::NoTimelock)?;
        let grace = self.config.execution_grace;
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        let state = proposal.state(height, grace);
        if state != ProposalState::Succeeded {
            return Err(GovernanceError::InvalidProposalState(state));
        }

        let eta = height.checked_add(delay).ok_or(GovernanceError::Overflow)?;
        proposal.queued_eta = Some(eta);
        Ok(eta)
    }

    /// Begin execution: validate the state and hand back the action list.
    ///
    /// The caller applies every action atomically and then calls
    /// [`GovernorEngine::finish_execute`]. If application fails, skipping
    /// the finish call leaves the proposal executable again.
    ///
    /// # Errors
    ///
    /// - `InvalidProposalState` unless Succeeded (no timelock) or Queued
    /// - `TimelockNotExpired` before a queued proposal's eta
    pub fn start_execute(
        &self,
        id: ProposalId,
        height: TickHeight,
    ) -> GovernanceResult<Vec<GovernanceAction>> {
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        let state = proposal.state(height, self.config.execution_grace);
        match state {
            ProposalState::Succeeded if self.config.timelock_delay.is_none() => {}
            ProposalState::Queued => {
                let eta = proposal.queued_eta.unwrap_or(0);
                if height < eta {
                    return Err(GovernanceError::TimelockNotExpired { eta, height });
                }
            }
            other => return Err(GovernanceError::InvalidProposalState(other)),
        }

        Ok(proposal.actions.clone())
    }

    /// Mark a proposal executed after its actions were applied
    pub fn finish_execute(&mut self, id: ProposalId) -> GovernanceResult<()> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.executed = true;
        Ok(())
    }

    /// Cancel a proposal before its voting window closes.
    ///
    /// Only the proposer or the engine authority may cancel.
    pub fn cancel(
        &mut self,
        id: ProposalId,
        caller: IdentityId,
        height: TickHeight,
    ) -> GovernanceResult<()> {
        let grace = self.config.execution_grace;
        let authority = self.authority;
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if caller != proposal.proposer && caller != authority {
            return Err(GovernanceError::NotAuthorized);
        }

        let state = proposal.state(height, grace);
        if !matches!(state, ProposalState::Pending | ProposalState::Active) {
            return Err(GovernanceError::InvalidProposalState(state));
        }

        proposal.canceled = true;
        Ok(())
    }

    // ========================================================================
    // READ OPERATIONS
    // ========================================================================

    /// Get a proposal by id
    pub fn proposal(&self, id: &ProposalId) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    /// Compute a proposal's state at a height
    pub fn state_of(&self, id: &ProposalId, height: TickHeight) -> GovernanceResult<ProposalState> {
        let proposal = self
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(*id))?;
        Ok(proposal.state(height, self.config.execution_grace))
    }

    /// Get one identity's vote on a proposal
    pub fn vote_of(&self, id: &ProposalId, voter: &IdentityId) -> Option<&VoteRecord> {
        self.proposals.get(id)?.votes.get(voter)
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of proposals ever created
    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }
}
