//! Governance actions
//!
//! The privileged admission-controller operations a passed proposal may
//! invoke. Actions are the off-chain analogue of encoded calls: a proposal
//! carries an ordered list of them, and execution replays the list against
//! the controller all-or-nothing.

use serde::{Deserialize, Serialize};
use std::fmt;

use lib_admission::MintPhase;
use lib_types::{Amount, IdentityId};

/// One privileged operation a proposal may carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceAction {
    /// Release every payee's owed amount
    ReleaseFunds,

    /// Release one payee's owed amount
    ReleasePayee(IdentityId),

    /// Freeze the instance and open refund claims
    ActivateRefund,

    /// Switch the minting phase
    SetPhase(MintPhase),

    /// Replace the unit price
    SetUnitPrice(Amount),
}

impl fmt::Display for GovernanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GovernanceAction::ReleaseFunds => write!(f, "release-funds"),
            GovernanceAction::ReleasePayee(id) => write!(f, "release-payee({})", id),
            GovernanceAction::ActivateRefund => write!(f, "activate-refund"),
            GovernanceAction::SetPhase(phase) => write!(f, "set-phase({})", phase),
            GovernanceAction::SetUnitPrice(price) => write!(f, "set-unit-price({})", price),
        }
    }
}
