//! Governance lifecycle tests over a full instance

use anyhow::Result;

use lib_admission::MintPhase;
use lib_governance::{GovernanceAction, ProposalState, VoteSupport};
use lib_types::{Amount, IdentityId};
use mintgate::{Instance, InstanceSpec, PayeeSpec, ServiceError};

const FEE: Amount = 1_000_000_000;

fn id(byte: u8) -> IdentityId {
    IdentityId::new([byte; 32])
}

fn owner() -> IdentityId {
    id(1)
}

fn platform() -> IdentityId {
    id(2)
}

fn buyer() -> IdentityId {
    id(3)
}

fn spec() -> InstanceSpec {
    InstanceSpec {
        label: "governed-drop".to_string(),
        metadata_uri: "storage/placeholder.json".to_string(),
        authority: owner(),
        platform_wallet: platform(),
        unit_price: FEE,
        supply_cap: 10_000,
        per_transaction_cap: 100,
        per_identity_whitelist_cap: 1,
        whitelist_root: None,
        payees: vec![PayeeSpec { identity: owner(), shares: 9_500 }],
        governance: Default::default(),
    }
}

/// Instance with 100 slots minted by the buyer, ready to govern
fn governed_instance() -> Result<Instance> {
    let mut instance = Instance::from_spec(&spec())?;
    let controller = instance.controller_mut();
    controller.set_phase(&owner(), MintPhase::PublicOpen).unwrap();
    controller.public_mint(buyer(), 100, 100 * FEE).unwrap();
    Ok(instance)
}

#[test]
fn passed_release_proposal_drains_the_splitter() -> Result<()> {
    let mut instance = governed_instance()?;

    let pid = instance.propose(
        buyer(),
        vec![GovernanceAction::ReleaseFunds],
        "Release funds to project creator",
    )?;
    assert_eq!(instance.proposal_state(&pid)?, ProposalState::Pending);

    // Quorum is 30% of the 100-slot snapshot
    assert_eq!(instance.engine().proposal(&pid).unwrap().quorum_weight, 30);

    instance.advance_ticks(1);
    assert_eq!(instance.proposal_state(&pid)?, ProposalState::Active);
    instance.cast_vote(pid, buyer(), VoteSupport::For)?;

    instance.advance_ticks(100);
    assert_eq!(instance.proposal_state(&pid)?, ProposalState::Succeeded);

    instance.execute_proposal(pid)?;
    assert_eq!(instance.proposal_state(&pid)?, ProposalState::Executed);

    let controller = instance.controller();
    assert_eq!(controller.balance(), 0);
    assert_eq!(controller.splitter().released_to(&owner()), 95 * FEE);
    assert_eq!(controller.splitter().released_to(&platform()), 5 * FEE);
    Ok(())
}

#[test]
fn passed_refund_proposal_freezes_and_refunds() -> Result<()> {
    let mut instance = governed_instance()?;

    let pid = instance.propose(
        buyer(),
        vec![GovernanceAction::ActivateRefund],
        "Activate a refund for the project",
    )?;
    instance.advance_ticks(1);
    instance.cast_vote(pid, buyer(), VoteSupport::For)?;
    instance.advance_ticks(100);
    instance.execute_proposal(pid)?;

    let controller = instance.controller_mut();
    assert!(controller.refund_active());
    assert_eq!(controller.phase(), MintPhase::Disabled);

    let refunded = controller.claim_refund(buyer()).unwrap();
    assert_eq!(refunded, 100 * FEE);
    assert_eq!(controller.balance(), 0);
    assert_eq!(controller.live_supply(), 0);
    Ok(())
}

#[test]
fn defeated_proposal_cannot_execute() -> Result<()> {
    let mut instance = governed_instance()?;

    let pid = instance.propose(
        buyer(),
        vec![GovernanceAction::ReleaseFunds],
        "Release funds to project creator",
    )?;
    instance.advance_ticks(1);
    instance.cast_vote(pid, buyer(), VoteSupport::Against)?;
    instance.advance_ticks(100);

    assert_eq!(instance.proposal_state(&pid)?, ProposalState::Defeated);
    assert!(instance.execute_proposal(pid).is_err());
    assert_eq!(instance.controller().balance(), 100 * FEE);
    Ok(())
}

#[test]
fn quorum_shortfall_defeats_even_a_unanimous_yes() -> Result<()> {
    let mut instance = Instance::from_spec(&spec())?;
    {
        let controller = instance.controller_mut();
        controller.set_phase(&owner(), MintPhase::PublicOpen).unwrap();
        // Buyer holds 20 of 100 slots; the rest sit with a silent holder
        controller.public_mint(buyer(), 20, 20 * FEE).unwrap();
        controller.public_mint(id(7), 80, 80 * FEE).unwrap();
    }

    let pid = instance.propose(
        buyer(),
        vec![GovernanceAction::ReleaseFunds],
        "Release funds to project creator",
    )?;
    instance.advance_ticks(1);
    instance.cast_vote(pid, buyer(), VoteSupport::For)?;
    instance.advance_ticks(100);

    // 20 of 100 voted; quorum needs 30
    assert_eq!(instance.proposal_state(&pid)?, ProposalState::Defeated);
    Ok(())
}

#[test]
fn failed_action_aborts_the_whole_batch() -> Result<()> {
    let mut instance = governed_instance()?;

    // Second action targets a stranger, which must fail and roll back the
    // release performed by the first action
    let pid = instance.propose(
        buyer(),
        vec![
            GovernanceAction::ReleaseFunds,
            GovernanceAction::ReleasePayee(id(42)),
        ],
        "Release twice, badly",
    )?;
    instance.advance_ticks(1);
    instance.cast_vote(pid, buyer(), VoteSupport::For)?;
    instance.advance_ticks(100);

    let err = instance.execute_proposal(pid).unwrap_err();
    assert!(matches!(err, ServiceError::Admission(_)));

    // Nothing was released and the proposal stayed executable
    assert_eq!(instance.controller().balance(), 100 * FEE);
    assert_eq!(instance.controller().splitter().total_released(), 0);
    assert_eq!(instance.proposal_state(&pid)?, ProposalState::Succeeded);
    Ok(())
}

#[test]
fn snapshot_voting_ignores_later_buyers() -> Result<()> {
    let mut instance = governed_instance()?;

    let pid = instance.propose(
        buyer(),
        vec![GovernanceAction::ReleaseFunds],
        "Release funds to project creator",
    )?;
    instance.advance_ticks(1);

    // A new buyer mints after the snapshot; they cannot vote on this one
    instance
        .controller_mut()
        .public_mint(id(8), 50, 50 * FEE)
        .unwrap();
    let err = instance.cast_vote(pid, id(8), VoteSupport::For).unwrap_err();
    assert!(matches!(err, ServiceError::Governance(_)));
    Ok(())
}

#[test]
fn governance_can_pause_and_reprice() -> Result<()> {
    let mut instance = governed_instance()?;

    let pid = instance.propose(
        buyer(),
        vec![
            GovernanceAction::SetUnitPrice(2 * FEE),
            GovernanceAction::SetPhase(MintPhase::Disabled),
        ],
        "Double the price and pause",
    )?;
    instance.advance_ticks(1);
    instance.cast_vote(pid, buyer(), VoteSupport::For)?;
    instance.advance_ticks(100);
    instance.execute_proposal(pid)?;

    assert_eq!(instance.controller().unit_price(), 2 * FEE);
    assert_eq!(instance.controller().phase(), MintPhase::Disabled);
    Ok(())
}

#[test]
fn timelocked_proposal_queues_before_executing() -> Result<()> {
    let mut timelocked = spec();
    timelocked.governance.timelock_delay = Some(20);
    let mut instance = Instance::from_spec(&timelocked)?;
    {
        let controller = instance.controller_mut();
        controller.set_phase(&owner(), MintPhase::PublicOpen).unwrap();
        controller.public_mint(buyer(), 100, 100 * FEE).unwrap();
    }

    let pid = instance.propose(
        buyer(),
        vec![GovernanceAction::ReleaseFunds],
        "Release funds to project creator",
    )?;
    instance.advance_ticks(1);
    instance.cast_vote(pid, buyer(), VoteSupport::For)?;
    instance.advance_ticks(100);

    assert_eq!(instance.proposal_state(&pid)?, ProposalState::Succeeded);
    assert!(instance.execute_proposal(pid).is_err());

    instance.queue_proposal(pid)?;
    assert_eq!(instance.proposal_state(&pid)?, ProposalState::Queued);
    assert!(instance.execute_proposal(pid).is_err());

    instance.advance_ticks(20);
    instance.execute_proposal(pid)?;
    assert_eq!(instance.controller().balance(), 0);
    Ok(())
}
