//! Single-writer instance service
//!
//! Every state transition of an instance flows through one mpsc queue and
//! is applied by one task; operations run to completion with no
//! interleaving, matching the serializability contract of the original
//! execution environment. The cloneable [`InstanceHandle`] is the
//! request/response API.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lib_admission::{MintPhase, SlotRange};
use lib_crypto::merkle::{verify_membership, MerkleProof};
use lib_governance::{GovernanceAction, ProposalState, VoteSupport};
use lib_types::{Amount, IdentityId, ProposalId, RootHash, ShareWeight, TickHeight};

use crate::error::ServiceError;
use crate::instance::Instance;

/// Command queue depth before senders start waiting
const COMMAND_QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, ServiceError>>;

/// Receipt for a successful mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    /// The contiguous slot range issued
    pub slots: SlotRange,

    /// The payment credited
    pub paid: Amount,
}

/// Point-in-time view of an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub label: String,
    pub phase: MintPhase,
    pub unit_price: Amount,
    pub supply_cap: u64,
    pub issued: u64,
    pub live_supply: u64,
    pub balance: Amount,
    pub total_received: Amount,
    pub height: TickHeight,
    pub refund_active: bool,
}

/// Administrative mutation, authority-checked by the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminOp {
    SetPhase(MintPhase),
    SetUnitPrice(Amount),
    SetPerTransactionCap(u64),
    SetPerIdentityWhitelistCap(u64),
    SetWhitelistRoot(RootHash),
    SetSupplyCap(u64),
    AddPayee {
        identity: IdentityId,
        shares: ShareWeight,
    },
    SetGovernor(IdentityId),
    TransferAuthority(IdentityId),
}

enum Command {
    PublicMint {
        caller: IdentityId,
        n: u64,
        paid: Amount,
        reply: Reply<MintReceipt>,
    },
    WhitelistMint {
        caller: IdentityId,
        proof: MerkleProof,
        n: u64,
        paid: Amount,
        reply: Reply<MintReceipt>,
    },
    Verify {
        identity: IdentityId,
        proof: MerkleProof,
        reply: oneshot::Sender<bool>,
    },
    Release {
        caller: IdentityId,
        payee: IdentityId,
        reply: Reply<Amount>,
    },
    ReleaseAll {
        caller: IdentityId,
        reply: Reply<Vec<(IdentityId, Amount)>>,
    },
    ClaimRefund {
        caller: IdentityId,
        reply: Reply<Amount>,
    },
    Admin {
        caller: IdentityId,
        op: AdminOp,
        reply: Reply<()>,
    },
    Propose {
        proposer: IdentityId,
        actions: Vec<GovernanceAction>,
        description: String,
        reply: Reply<ProposalId>,
    },
    CastVote {
        id: ProposalId,
        voter: IdentityId,
        support: VoteSupport,
        reply: Reply<()>,
    },
    QueueProposal {
        id: ProposalId,
        reply: Reply<TickHeight>,
    },
    ExecuteProposal {
        id: ProposalId,
        reply: Reply<()>,
    },
    CancelProposal {
        id: ProposalId,
        caller: IdentityId,
        reply: Reply<()>,
    },
    GetProposalState {
        id: ProposalId,
        reply: Reply<ProposalState>,
    },
    AdvanceTicks {
        n: TickHeight,
        reply: oneshot::Sender<TickHeight>,
    },
    Status {
        reply: oneshot::Sender<InstanceStatus>,
    },
    Snapshot {
        path: PathBuf,
        reply: oneshot::Sender<anyhow::Result<()>>,
    },
}

/// Start the single-writer task for an instance.
pub fn spawn(instance: Instance) -> (InstanceHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let task = tokio::spawn(run(instance, rx));
    (InstanceHandle { tx }, task)
}

async fn run(mut instance: Instance, mut rx: mpsc::Receiver<Command>) {
    info!(label = %instance.label(), "instance service started");
    while let Some(command) = rx.recv().await {
        handle_command(&mut instance, command);
    }
    info!(label = %instance.label(), "instance service stopped");
}

fn handle_command(instance: &mut Instance, command: Command) {
    match command {
        Command::PublicMint { caller, n, paid, reply } => {
            let result = instance
                .controller_mut()
                .public_mint(caller, n, paid)
                .map(|slots| {
                    info!(%caller, n, slots = %slots, "public mint");
                    MintReceipt { slots, paid }
                })
                .map_err(|e| {
                    debug!(%caller, n, error = %e, "public mint rejected");
                    e.into()
                });
            let _ = reply.send(result);
        }
        Command::WhitelistMint { caller, proof, n, paid, reply } => {
            let result = instance
                .controller_mut()
                .whitelist_mint(caller, &proof, n, paid)
                .map(|slots| {
                    info!(%caller, n, slots = %slots, "whitelist mint");
                    MintReceipt { slots, paid }
                })
                .map_err(|e| {
                    debug!(%caller, n, error = %e, "whitelist mint rejected");
                    e.into()
                });
            let _ = reply.send(result);
        }
        Command::Verify { identity, proof, reply } => {
            let verified = match instance.controller().whitelist_root() {
                Some(root) => verify_membership(root, &identity, &proof),
                None => false,
            };
            let _ = reply.send(verified);
        }
        Command::Release { caller, payee, reply } => {
            let result = instance
                .controller_mut()
                .release(&caller, &payee)
                .map(|amount| {
                    info!(%payee, amount, "released");
                    amount
                })
                .map_err(Into::into);
            let _ = reply.send(result);
        }
        Command::ReleaseAll { caller, reply } => {
            let result = instance
                .controller_mut()
                .release_all(&caller)
                .map(|payouts| {
                    let total: Amount = payouts.iter().map(|(_, a)| a).sum();
                    info!(payees = payouts.len(), total, "released all");
                    payouts
                })
                .map_err(Into::into);
            let _ = reply.send(result);
        }
        Command::ClaimRefund { caller, reply } => {
            let result = instance
                .controller_mut()
                .claim_refund(caller)
                .map(|amount| {
                    info!(%caller, amount, "refund claimed");
                    amount
                })
                .map_err(Into::into);
            let _ = reply.send(result);
        }
        Command::Admin { caller, op, reply } => {
            let result = apply_admin(instance, &caller, op).map_err(Into::into);
            let _ = reply.send(result);
        }
        Command::Propose { proposer, actions, description, reply } => {
            let _ = reply.send(instance.propose(proposer, actions, &description));
        }
        Command::CastVote { id, voter, support, reply } => {
            let _ = reply.send(instance.cast_vote(id, voter, support));
        }
        Command::QueueProposal { id, reply } => {
            let _ = reply.send(instance.queue_proposal(id));
        }
        Command::ExecuteProposal { id, reply } => {
            let result = instance.execute_proposal(id);
            if let Err(e) = &result {
                warn!(proposal = %id, error = %e, "proposal execution failed");
            }
            let _ = reply.send(result);
        }
        Command::CancelProposal { id, caller, reply } => {
            let _ = reply.send(instance.cancel_proposal(id, caller));
        }
        Command::GetProposalState { id, reply } => {
            let _ = reply.send(instance.proposal_state(&id));
        }
        Command::AdvanceTicks { n, reply } => {
            let _ = reply.send(instance.advance_ticks(n));
        }
        Command::Status { reply } => {
            let _ = reply.send(status_of(instance));
        }
        Command::Snapshot { path, reply } => {
            let _ = reply.send(instance.save_to_file(&path));
        }
    }
}

fn apply_admin(
    instance: &mut Instance,
    caller: &IdentityId,
    op: AdminOp,
) -> Result<(), lib_admission::AdmissionError> {
    let controller = instance.controller_mut();
    match op {
        AdminOp::SetPhase(phase) => controller.set_phase(caller, phase),
        AdminOp::SetUnitPrice(price) => controller.set_unit_price(caller, price),
        AdminOp::SetPerTransactionCap(cap) => controller.set_per_transaction_cap(caller, cap),
        AdminOp::SetPerIdentityWhitelistCap(cap) => {
            controller.set_per_identity_whitelist_cap(caller, cap)
        }
        AdminOp::SetWhitelistRoot(root) => controller.set_whitelist_root(caller, root),
        AdminOp::SetSupplyCap(cap) => controller.set_supply_cap(caller, cap),
        AdminOp::AddPayee { identity, shares } => controller.add_payee(caller, identity, shares),
        AdminOp::SetGovernor(governor) => controller.set_governor(caller, governor),
        AdminOp::TransferAuthority(new_authority) => {
            controller.transfer_authority(caller, new_authority)
        }
    }
}

fn status_of(instance: &Instance) -> InstanceStatus {
    let controller = instance.controller();
    InstanceStatus {
        label: instance.label().to_string(),
        phase: controller.phase(),
        unit_price: controller.unit_price(),
        supply_cap: controller.supply_cap(),
        issued: controller.issued(),
        live_supply: controller.live_supply(),
        balance: controller.balance(),
        total_received: controller.splitter().total_received(),
        height: instance.height(),
        refund_active: controller.refund_active(),
    }
}

/// Decode hex-encoded proof siblings arriving over the wire.
///
/// This is where `MalformedProof` lives: wrong-length or non-hex siblings
/// are rejected here, before verification runs.
pub fn decode_proof_hex(siblings: &[String]) -> Result<MerkleProof, ServiceError> {
    let mut decoded = Vec::with_capacity(siblings.len());
    for (index, sibling) in siblings.iter().enumerate() {
        let stripped = sibling.strip_prefix("0x").unwrap_or(sibling);
        let bytes = hex::decode(stripped)
            .map_err(|e| ServiceError::MalformedProof(format!("sibling {}: {}", index, e)))?;
        if bytes.len() != 32 {
            return Err(ServiceError::MalformedProof(format!(
                "sibling {}: expected 32 bytes, got {}",
                index,
                bytes.len()
            )));
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        decoded.push(hash);
    }
    Ok(MerkleProof::new(decoded))
}

/// Cloneable request/response handle to a running instance service
#[derive(Clone)]
pub struct InstanceHandle {
    tx: mpsc::Sender<Command>,
}

impl InstanceHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ServiceError::Closed)?;
        rx.await.map_err(|_| ServiceError::Closed)?
    }

    async fn request_infallible<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ServiceError::Closed)?;
        rx.await.map_err(|_| ServiceError::Closed)
    }

    /// Mint through the public path
    pub async fn public_mint(
        &self,
        caller: IdentityId,
        n: u64,
        paid: Amount,
    ) -> Result<MintReceipt, ServiceError> {
        self.request(|reply| Command::PublicMint { caller, n, paid, reply })
            .await
    }

    /// Mint through the whitelist path with a decoded proof
    pub async fn whitelist_mint(
        &self,
        caller: IdentityId,
        proof: MerkleProof,
        n: u64,
        paid: Amount,
    ) -> Result<MintReceipt, ServiceError> {
        self.request(|reply| Command::WhitelistMint { caller, proof, n, paid, reply })
            .await
    }

    /// Mint through the whitelist path with hex-encoded proof siblings
    pub async fn whitelist_mint_hex(
        &self,
        caller: IdentityId,
        siblings: &[String],
        n: u64,
        paid: Amount,
    ) -> Result<MintReceipt, ServiceError> {
        let proof = decode_proof_hex(siblings)?;
        self.whitelist_mint(caller, proof, n, paid).await
    }

    /// Check a membership proof against the current root
    pub async fn verify(
        &self,
        identity: IdentityId,
        proof: MerkleProof,
    ) -> Result<bool, ServiceError> {
        self.request_infallible(|reply| Command::Verify { identity, proof, reply })
            .await
    }

    /// Release one payee's owed amount
    pub async fn release(
        &self,
        caller: IdentityId,
        payee: IdentityId,
    ) -> Result<Amount, ServiceError> {
        self.request(|reply| Command::Release { caller, payee, reply })
            .await
    }

    /// Release every payee's owed amount
    pub async fn release_all(
        &self,
        caller: IdentityId,
    ) -> Result<Vec<(IdentityId, Amount)>, ServiceError> {
        self.request(|reply| Command::ReleaseAll { caller, reply }).await
    }

    /// Claim a refund once one is active
    pub async fn claim_refund(&self, caller: IdentityId) -> Result<Amount, ServiceError> {
        self.request(|reply| Command::ClaimRefund { caller, reply }).await
    }

    /// Apply an administrative mutation
    pub async fn admin(&self, caller: IdentityId, op: AdminOp) -> Result<(), ServiceError> {
        self.request(|reply| Command::Admin { caller, op, reply }).await
    }

    /// Create a governance proposal
    pub async fn propose(
        &self,
        proposer: IdentityId,
        actions: Vec<GovernanceAction>,
        description: impl Into<String>,
    ) -> Result<ProposalId, ServiceError> {
        let description = description.into();
        self.request(|reply| Command::Propose { proposer, actions, description, reply })
            .await
    }

    /// Cast a vote
    pub async fn cast_vote(
        &self,
        id: ProposalId,
        voter: IdentityId,
        support: VoteSupport,
    ) -> Result<(), ServiceError> {
        self.request(|reply| Command::CastVote { id, voter, support, reply })
            .await
    }

    /// Queue a succeeded proposal behind the timelock
    pub async fn queue_proposal(&self, id: ProposalId) -> Result<TickHeight, ServiceError> {
        self.request(|reply| Command::QueueProposal { id, reply }).await
    }

    /// Execute a passed proposal
    pub async fn execute_proposal(&self, id: ProposalId) -> Result<(), ServiceError> {
        self.request(|reply| Command::ExecuteProposal { id, reply }).await
    }

    /// Cancel a proposal
    pub async fn cancel_proposal(
        &self,
        id: ProposalId,
        caller: IdentityId,
    ) -> Result<(), ServiceError> {
        self.request(|reply| Command::CancelProposal { id, caller, reply })
            .await
    }

    /// Compute a proposal's state at the current height
    pub async fn proposal_state(&self, id: ProposalId) -> Result<ProposalState, ServiceError> {
        self.request(|reply| Command::GetProposalState { id, reply }).await
    }

    /// Advance the tick counter; returns the new height
    pub async fn advance_ticks(&self, n: TickHeight) -> Result<TickHeight, ServiceError> {
        self.request_infallible(|reply| Command::AdvanceTicks { n, reply })
            .await
    }

    /// Current instance status
    pub async fn status(&self) -> Result<InstanceStatus, ServiceError> {
        self.request_infallible(|reply| Command::Status { reply }).await
    }

    /// Write a snapshot of the instance state to a file
    pub async fn snapshot(&self, path: PathBuf) -> Result<(), ServiceError> {
        self.request_infallible(|reply| Command::Snapshot { path, reply })
            .await?
            .map_err(|e| ServiceError::Snapshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_proof_hex_accepts_32_byte_siblings() {
        let sibling = hex::encode([7u8; 32]);
        let proof = decode_proof_hex(&[sibling.clone(), format!("0x{}", sibling)]).unwrap();
        assert_eq!(proof.len(), 2);
        assert_eq!(proof.siblings()[0], [7u8; 32]);
    }

    #[test]
    fn test_decode_proof_hex_rejects_wrong_length() {
        let err = decode_proof_hex(&["deadbeef".to_string()]).unwrap_err();
        assert!(matches!(err, ServiceError::MalformedProof(_)));
        assert!(err.to_string().contains("expected 32 bytes"));
    }

    #[test]
    fn test_decode_proof_hex_rejects_non_hex() {
        let err = decode_proof_hex(&["zz".repeat(32)]).unwrap_err();
        assert!(matches!(err, ServiceError::MalformedProof(_)));
    }
}
