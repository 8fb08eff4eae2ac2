//! Instance assembly
//!
//! One `Instance` owns a mint admission controller, its governor engine,
//! and the monotonic tick counter governance timing runs on. It also owns
//! the governance glue: proposals are created against a voting-power
//! snapshot taken from current holdings, and execution applies the action
//! list to a staged copy of the controller so a failing action aborts the
//! whole batch.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use lib_admission::{AdmissionError, MintConfig, MintController};
use lib_crypto::hashing::hash_blake3_multiple;
use lib_governance::{
    EngineConfig, GovernanceAction, GovernorEngine, ProposalState, VoteSupport,
};
use lib_types::{IdentityId, ProposalId, TickHeight};

use crate::config::InstanceSpec;
use crate::error::ServiceError;

/// Domain separator for the derived governor identity
const GOVERNOR_DOMAIN: &[u8] = b"mintgate/governor/v1";

/// One deployed admission-and-accounting instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Display label from the spec
    label: String,

    /// Opaque metadata location from the spec
    metadata_uri: String,

    /// The admission controller
    controller: MintController,

    /// The governor engine
    engine: GovernorEngine,

    /// Synthetic identity the engine executes privileged calls under
    governor_id: IdentityId,

    /// Monotonic tick counter; governance windows are measured in it
    height: TickHeight,
}

impl Instance {
    /// Build an instance from a validated spec.
    pub fn from_spec(spec: &InstanceSpec) -> Result<Self> {
        spec.validate()?;

        let config = MintConfig {
            unit_price: spec.unit_price,
            per_transaction_cap: spec.per_transaction_cap,
            per_identity_whitelist_cap: spec.per_identity_whitelist_cap,
            whitelist_root: spec.whitelist_root,
        };
        let mut controller = MintController::new(
            spec.authority,
            config,
            spec.supply_cap,
            &spec.payee_table(),
        )
        .context("building controller")?;

        // The engine is in-process, so the governor role gets a synthetic
        // identity derived from the authority key.
        let governor_id = derive_governor_id(&spec.authority);
        controller
            .set_governor(&spec.authority, governor_id)
            .context("registering governor")?;

        let engine = GovernorEngine::new(spec.governance.to_engine_config(), spec.authority);

        info!(label = %spec.label, supply_cap = spec.supply_cap, "instance assembled");
        Ok(Self {
            label: spec.label.clone(),
            metadata_uri: spec.metadata_uri.clone(),
            controller,
            engine,
            governor_id,
            height: 0,
        })
    }

    // ========================================================================
    // TICKS
    // ========================================================================

    /// Advance the tick counter
    pub fn advance_ticks(&mut self, n: TickHeight) -> TickHeight {
        self.height = self.height.saturating_add(n);
        self.height
    }

    pub fn height(&self) -> TickHeight {
        self.height
    }

    // ========================================================================
    // ACCESS
    // ========================================================================

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn metadata_uri(&self) -> &str {
        &self.metadata_uri
    }

    pub fn controller(&self) -> &MintController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut MintController {
        &mut self.controller
    }

    pub fn engine(&self) -> &GovernorEngine {
        &self.engine
    }

    pub fn governor_id(&self) -> &IdentityId {
        &self.governor_id
    }

    // ========================================================================
    // GOVERNANCE GLUE
    // ========================================================================

    /// Create a proposal. The voting-power snapshot is captured from
    /// current holdings at this moment and frozen into the proposal.
    pub fn propose(
        &mut self,
        proposer: IdentityId,
        actions: Vec<GovernanceAction>,
        description: &str,
    ) -> Result<ProposalId, ServiceError> {
        let snapshot: HashMap<IdentityId, u64> = self.controller.voting_snapshot();
        let id = self
            .engine
            .propose(proposer, actions, description, snapshot, self.height)?;
        info!(proposal = %id, %proposer, "proposal created");
        Ok(id)
    }

    /// Cast a vote at the current height
    pub fn cast_vote(
        &mut self,
        id: ProposalId,
        voter: IdentityId,
        support: VoteSupport,
    ) -> Result<(), ServiceError> {
        self.engine.cast_vote(id, voter, support, self.height)?;
        Ok(())
    }

    /// Queue a succeeded proposal behind the timelock
    pub fn queue_proposal(&mut self, id: ProposalId) -> Result<TickHeight, ServiceError> {
        Ok(self.engine.queue(id, self.height)?)
    }

    /// Execute a passed proposal.
    ///
    /// The action list is applied to a staged copy of the controller; the
    /// copy replaces the live controller only after every action
    /// succeeded, and only then is the proposal marked executed. A failed
    /// action aborts the whole batch and leaves the proposal executable.
    pub fn execute_proposal(&mut self, id: ProposalId) -> Result<(), ServiceError> {
        let actions = self.engine.start_execute(id, self.height)?;

        let mut staged = self.controller.clone();
        for action in &actions {
            apply_action(&mut staged, &self.governor_id, action)?;
        }
        self.controller = staged;
        self.engine.finish_execute(id)?;

        info!(proposal = %id, actions = actions.len(), "proposal executed");
        Ok(())
    }

    /// Compute a proposal's state at the current height
    pub fn proposal_state(&self, id: &ProposalId) -> Result<ProposalState, ServiceError> {
        Ok(self.engine.state_of(id, self.height)?)
    }

    /// Cancel a proposal before its voting window closes
    pub fn cancel_proposal(
        &mut self,
        id: ProposalId,
        caller: IdentityId,
    ) -> Result<(), ServiceError> {
        self.engine.cancel(id, caller, self.height)?;
        Ok(())
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Write a snapshot of the full instance state
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating snapshot {}", path.display()))?;
        serde_json::to_writer_pretty(file, self).context("encoding snapshot")?;
        Ok(())
    }

    /// Restore an instance from a snapshot
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening snapshot {}", path.display()))?;
        let instance: Instance =
            serde_json::from_reader(file).context("decoding snapshot")?;
        Ok(instance)
    }

    /// The engine configuration in force
    pub fn engine_config(&self) -> &EngineConfig {
        self.engine.config()
    }
}

/// Derive the synthetic governor identity for an authority
pub fn derive_governor_id(authority: &IdentityId) -> IdentityId {
    IdentityId::new(hash_blake3_multiple(&[GOVERNOR_DOMAIN, authority.as_bytes()]))
}

/// Replay one governance action against a controller under the governor
/// identity
fn apply_action(
    controller: &mut MintController,
    governor: &IdentityId,
    action: &GovernanceAction,
) -> Result<(), AdmissionError> {
    match action {
        GovernanceAction::ReleaseFunds => {
            controller.release_all(governor)?;
        }
        GovernanceAction::ReleasePayee(payee) => {
            controller.release(governor, payee)?;
        }
        GovernanceAction::ActivateRefund => {
            controller.activate_refund(governor)?;
        }
        GovernanceAction::SetPhase(phase) => {
            controller.set_phase(governor, *phase)?;
        }
        GovernanceAction::SetUnitPrice(price) => {
            controller.set_unit_price(governor, *price)?;
        }
    }
    Ok(())
}
