//! Mintgate Governance - Proposal, Vote, Execute
//!
//! This crate provides the proposal state machine gating privileged
//! admission-controller operations (fund release, refund activation,
//! pausing, repricing) behind a quorum and majority vote weighted by held
//! supply slots.
//!
//! # Key Principles
//!
//! 1. **Height-based only**: all timing is measured in opaque monotonic
//!    ticks injected by the caller; wall-clock time is never consulted
//! 2. **Snapshot voting**: voting weight is captured when the proposal is
//!    created and never changes afterwards
//! 3. **Content-addressed proposals**: the id is the hash of the action
//!    list and the description, so identical proposals collide
//! 4. **Two-phase execution**: the engine hands out the action list first
//!    and marks the proposal executed only after the caller has applied
//!    every action; a failed batch leaves the proposal executable again

pub mod actions;
pub mod engine;
pub mod errors;
pub mod proposal;

pub use actions::GovernanceAction;
pub use engine::{EngineConfig, GovernorEngine};
pub use errors::{GovernanceError, GovernanceResult};
pub use proposal::{Proposal, ProposalState, VoteRecord, VoteSupport};
