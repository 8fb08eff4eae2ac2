//! Mint admission controller
//!
//! Gates requests to acquire supply slots, enforcing phase, exact payment,
//! per-transaction and per-identity caps, and whitelist membership. The
//! controller composes the supply ledger, the payment splitter, and the
//! Merkle membership verifier; it is the single mutation point for one
//! deployed instance.
//!
//! # Roles
//!
//! - **Authority**: the single privileged identity owning all mutable
//!   configuration (price, caps, phase, whitelist root, payee table)
//! - **Governor**: an optional second identity, registered by the
//!   authority, allowed to invoke the operational subset (release funds,
//!   activate a refund, pause or reprice the drop) when a passed proposal
//!   executes
//!
//! # Invariants
//!
//! - Issued slots never exceed the configured cap
//! - A mint credits exactly `n * unit_price`; overpayment and underpayment
//!   are both rejected
//! - Whitelist claims per identity never exceed the per-identity cap
//! - Every operation is all-or-nothing; failures leave no partial state

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use lib_crypto::merkle::{verify_membership, MerkleProof};
use lib_splitter::{PaymentSplitter, SplitterError};
use lib_types::{Amount, IdentityId, RootHash, ShareWeight};

use crate::supply::{SlotRange, SupplyError, SupplyLedger};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors for admission operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionError {
    /// The requested mint path is not open in the current phase
    PhaseInactive { phase: MintPhase },

    /// Payment must match quantity times unit price exactly
    WrongPayment { expected: Amount, paid: Amount },

    /// The request exceeds the per-transaction mint cap
    ExceedsMaxTransactionMints { requested: u64, cap: u64 },

    /// The request exceeds the identity's remaining whitelist allowance
    ExceedsMaxWhitelistMints {
        claimed: u64,
        requested: u64,
        cap: u64,
    },

    /// The identity's proof does not match the published root
    NotWhitelisted,

    /// The supply cap does not cover the request
    CapExceeded { requested: u64, available: u64 },

    /// Nothing is currently owed
    NothingDue,

    /// Caller is not the controlling authority
    AuthorityRequired,

    /// A mint must cover at least one slot
    ZeroMint,

    /// The operation is unavailable while a refund is active
    RefundActive,

    /// Refund claims require an active refund
    RefundNotActive,

    /// The configuration field is locked once activity has begun
    ReconfigurationLocked,

    /// Splitter bookkeeping failure
    Splitter(SplitterError),

    /// Supply bookkeeping failure
    Supply(SupplyError),

    /// Arithmetic overflow
    Overflow,
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionError::PhaseInactive { phase } =>
                write!(f, "minting path not open in phase {}", phase),
            AdmissionError::WrongPayment { expected, paid } =>
                write!(f, "wrong payment: expected {} got {}", expected, paid),
            AdmissionError::ExceedsMaxTransactionMints { requested, cap } =>
                write!(f, "exceeds per-transaction mint cap: {} > {}", requested, cap),
            AdmissionError::ExceedsMaxWhitelistMints { claimed, requested, cap } => write!(
                f,
                "exceeds whitelist allowance: {} claimed + {} requested > {}",
                claimed, requested, cap
            ),
            AdmissionError::NotWhitelisted => write!(f, "identity not whitelisted"),
            AdmissionError::CapExceeded { requested, available } => write!(
                f,
                "supply cap exceeded: requested {} with {} available",
                requested, available
            ),
            AdmissionError::NothingDue => write!(f, "nothing due"),
            AdmissionError::AuthorityRequired => write!(f, "caller is not the authority"),
            AdmissionError::ZeroMint => write!(f, "mint quantity must be at least one"),
            AdmissionError::RefundActive => write!(f, "unavailable while a refund is active"),
            AdmissionError::RefundNotActive => write!(f, "no refund is active"),
            AdmissionError::ReconfigurationLocked =>
                write!(f, "configuration is locked once activity has begun"),
            AdmissionError::Splitter(e) => write!(f, "splitter: {}", e),
            AdmissionError::Supply(e) => write!(f, "supply: {}", e),
            AdmissionError::Overflow => write!(f, "arithmetic overflow"),
        }
    }
}

impl std::error::Error for AdmissionError {}

impl From<SupplyError> for AdmissionError {
    fn from(e: SupplyError) -> Self {
        match e {
            SupplyError::CapExceeded { requested, available } =>
                AdmissionError::CapExceeded { requested, available },
            SupplyError::ZeroReservation => AdmissionError::ZeroMint,
            SupplyError::ReconfigurationLocked => AdmissionError::ReconfigurationLocked,
            SupplyError::Overflow => AdmissionError::Overflow,
            other => AdmissionError::Supply(other),
        }
    }
}

impl From<SplitterError> for AdmissionError {
    fn from(e: SplitterError) -> Self {
        match e {
            SplitterError::NothingDue => AdmissionError::NothingDue,
            SplitterError::ReleasesBegun => AdmissionError::ReconfigurationLocked,
            SplitterError::Overflow => AdmissionError::Overflow,
            other => AdmissionError::Splitter(other),
        }
    }
}

// ============================================================================
// TYPE DEFINITIONS
// ============================================================================

/// Minting phase.
///
/// A strict enum: the public and whitelist paths can never be open at the
/// same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MintPhase {
    /// No minting path is open
    Disabled,

    /// Anyone may mint through the public path
    PublicOpen,

    /// Only whitelisted identities may mint, with a membership proof
    WhitelistOpen,
}

impl fmt::Display for MintPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintPhase::Disabled => write!(f, "disabled"),
            MintPhase::PublicOpen => write!(f, "public-open"),
            MintPhase::WhitelistOpen => write!(f, "whitelist-open"),
        }
    }
}

/// Mutable mint configuration, owned by the authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintConfig {
    /// Price of one slot in atomic units
    pub unit_price: Amount,

    /// Maximum slots in a single mint request
    pub per_transaction_cap: u64,

    /// Maximum slots one identity may claim through the whitelist path
    pub per_identity_whitelist_cap: u64,

    /// Published membership root; `None` until the authority sets one
    pub whitelist_root: Option<RootHash>,
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Mint admission controller.
///
/// Not internally synchronized. All mutation must be serialized by the
/// caller; the service layer runs one single-writer actor per instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintController {
    /// Controlling authority
    authority: IdentityId,

    /// Registered governor, if any
    governor: Option<IdentityId>,

    /// Current minting phase
    phase: MintPhase,

    /// Mutable configuration
    config: MintConfig,

    /// Slot issuance ledger
    supply: SupplyLedger,

    /// Payment splitting ledger
    splitter: PaymentSplitter,

    /// Slots claimed through the whitelist path, per identity
    whitelist_claimed: HashMap<IdentityId, u64>,

    /// Live slots held, per identity
    holdings: HashMap<IdentityId, u64>,

    /// Total paid, per identity; drives refund claims
    paid: HashMap<IdentityId, Amount>,

    /// Once set, minting and releases are frozen and refund claims open
    refund_active: bool,
}

impl MintController {
    /// Create a controller.
    ///
    /// Minting starts in `Disabled`; the authority opens a phase when
    /// ready.
    ///
    /// # Errors
    ///
    /// - `Splitter` variants if the payee table is empty, duplicated, or
    ///   carries zero weights
    pub fn new(
        authority: IdentityId,
        config: MintConfig,
        supply_cap: u64,
        payees: &[(IdentityId, ShareWeight)],
    ) -> Result<Self, AdmissionError> {
        let splitter = PaymentSplitter::new(payees)?;
        Ok(Self {
            authority,
            governor: None,
            phase: MintPhase::Disabled,
            config,
            supply: SupplyLedger::new(supply_cap),
            splitter,
            whitelist_claimed: HashMap::new(),
            holdings: HashMap::new(),
            paid: HashMap::new(),
            refund_active: false,
        })
    }

    fn require_authority(&self, caller: &IdentityId) -> Result<(), AdmissionError> {
        if *caller != self.authority {
            return Err(AdmissionError::AuthorityRequired);
        }
        Ok(())
    }

    fn require_privileged(&self, caller: &IdentityId) -> Result<(), AdmissionError> {
        if *caller == self.authority || Some(*caller) == self.governor {
            return Ok(());
        }
        Err(AdmissionError::AuthorityRequired)
    }

    // ========================================================================
    // MINTING
    // ========================================================================

    /// Mint `n` slots through the public path.
    ///
    /// # Errors
    ///
    /// - `RefundActive` once a refund has been activated
    /// - `PhaseInactive` unless the phase is `PublicOpen`
    /// - `ZeroMint` for `n == 0`
    /// - `ExceedsMaxTransactionMints` if `n` is over the per-request cap
    /// - `WrongPayment` unless `paid == n * unit_price` exactly
    /// - `CapExceeded` if the supply cap does not cover `n`
    pub fn public_mint(
        &mut self,
        caller: IdentityId,
        n: u64,
        paid: Amount,
    ) -> Result<SlotRange, AdmissionError> {
        if self.refund_active {
            return Err(AdmissionError::RefundActive);
        }
        if self.phase != MintPhase::PublicOpen {
            return Err(AdmissionError::PhaseInactive { phase: self.phase });
        }
        self.check_quantity(n)?;
        self.check_payment(n, paid)?;

        self.settle(caller, n, paid)
    }

    /// Mint `n` slots through the whitelist path with a membership proof.
    ///
    /// Proofs are checked against the root current at verification time; a
    /// root replacement immediately changes which identities verify.
    ///
    /// # Errors
    ///
    /// As [`MintController::public_mint`], except the phase must be
    /// `WhitelistOpen`, plus:
    /// - `NotWhitelisted` if no root is set or the proof does not match
    /// - `ExceedsMaxWhitelistMints` if the identity's claimed count plus
    ///   `n` passes the per-identity cap
    pub fn whitelist_mint(
        &mut self,
        caller: IdentityId,
        proof: &MerkleProof,
        n: u64,
        paid: Amount,
    ) -> Result<SlotRange, AdmissionError> {
        if self.refund_active {
            return Err(AdmissionError::RefundActive);
        }
        if self.phase != MintPhase::WhitelistOpen {
            return Err(AdmissionError::PhaseInactive { phase: self.phase });
        }
        self.check_quantity(n)?;

        let root = self
            .config
            .whitelist_root
            .ok_or(AdmissionError::NotWhitelisted)?;
        if !verify_membership(&root, &caller, proof) {
            return Err(AdmissionError::NotWhitelisted);
        }

        let claimed = self.whitelist_claimed.get(&caller).copied().unwrap_or(0);
        let cap = self.config.per_identity_whitelist_cap;
        if claimed.checked_add(n).ok_or(AdmissionError::Overflow)? > cap {
            return Err(AdmissionError::ExceedsMaxWhitelistMints {
                claimed,
                requested: n,
                cap,
            });
        }

        self.check_payment(n, paid)?;

        let range = self.settle(caller, n, paid)?;
        *self.whitelist_claimed.entry(caller).or_insert(0) += n;
        Ok(range)
    }

    fn check_quantity(&self, n: u64) -> Result<(), AdmissionError> {
        if n == 0 {
            return Err(AdmissionError::ZeroMint);
        }
        if n > self.config.per_transaction_cap {
            return Err(AdmissionError::ExceedsMaxTransactionMints {
                requested: n,
                cap: self.config.per_transaction_cap,
            });
        }
        Ok(())
    }

    fn check_payment(&self, n: u64, paid: Amount) -> Result<(), AdmissionError> {
        let expected = self
            .config
            .unit_price
            .checked_mul(n as Amount)
            .ok_or(AdmissionError::Overflow)?;
        if paid != expected {
            return Err(AdmissionError::WrongPayment { expected, paid });
        }
        Ok(())
    }

    /// Reserve the range and credit the payment. Reservation is the last
    /// fallible step, so a failure here leaves no partial state.
    fn settle(
        &mut self,
        caller: IdentityId,
        n: u64,
        paid: Amount,
    ) -> Result<SlotRange, AdmissionError> {
        if self.splitter.total_received().checked_add(paid).is_none() {
            return Err(AdmissionError::Overflow);
        }

        let range = self.supply.reserve(n)?;
        self.splitter.credit(paid)?;
        *self.holdings.entry(caller).or_insert(0) += n;
        *self.paid.entry(caller).or_insert(0) += paid;
        Ok(range)
    }

    // ========================================================================
    // ADMINISTRATIVE OPERATIONS (authority)
    // ========================================================================

    /// Switch the minting phase. Accepted from the authority or the
    /// governor, so a passed proposal can pause a drop.
    pub fn set_phase(
        &mut self,
        caller: &IdentityId,
        phase: MintPhase,
    ) -> Result<(), AdmissionError> {
        self.require_privileged(caller)?;
        self.phase = phase;
        Ok(())
    }

    /// Replace the unit price. Accepted from the authority or the
    /// governor.
    pub fn set_unit_price(
        &mut self,
        caller: &IdentityId,
        unit_price: Amount,
    ) -> Result<(), AdmissionError> {
        self.require_privileged(caller)?;
        self.config.unit_price = unit_price;
        Ok(())
    }

    /// Replace the per-transaction mint cap
    pub fn set_per_transaction_cap(
        &mut self,
        caller: &IdentityId,
        cap: u64,
    ) -> Result<(), AdmissionError> {
        self.require_authority(caller)?;
        self.config.per_transaction_cap = cap;
        Ok(())
    }

    /// Replace the per-identity whitelist cap
    pub fn set_per_identity_whitelist_cap(
        &mut self,
        caller: &IdentityId,
        cap: u64,
    ) -> Result<(), AdmissionError> {
        self.require_authority(caller)?;
        self.config.per_identity_whitelist_cap = cap;
        Ok(())
    }

    /// Publish a new whitelist root. In-flight proofs are checked against
    /// whatever root is current when they arrive.
    pub fn set_whitelist_root(
        &mut self,
        caller: &IdentityId,
        root: RootHash,
    ) -> Result<(), AdmissionError> {
        self.require_authority(caller)?;
        self.config.whitelist_root = Some(root);
        Ok(())
    }

    /// Replace the supply cap.
    ///
    /// # Errors
    ///
    /// - `ReconfigurationLocked` once any slot has been issued
    pub fn set_supply_cap(&mut self, caller: &IdentityId, cap: u64) -> Result<(), AdmissionError> {
        self.require_authority(caller)?;
        self.supply.set_cap(cap)?;
        Ok(())
    }

    /// Append a payee to the splitter table.
    ///
    /// # Errors
    ///
    /// - `ReconfigurationLocked` once any release has happened
    pub fn add_payee(
        &mut self,
        caller: &IdentityId,
        identity: IdentityId,
        weight: ShareWeight,
    ) -> Result<(), AdmissionError> {
        self.require_authority(caller)?;
        self.splitter.add_payee(identity, weight)?;
        Ok(())
    }

    /// Register the governor identity allowed to invoke privileged
    /// operations when proposals execute
    pub fn set_governor(
        &mut self,
        caller: &IdentityId,
        governor: IdentityId,
    ) -> Result<(), AdmissionError> {
        self.require_authority(caller)?;
        self.governor = Some(governor);
        Ok(())
    }

    /// Hand the authority role to another identity
    pub fn transfer_authority(
        &mut self,
        caller: &IdentityId,
        new_authority: IdentityId,
    ) -> Result<(), AdmissionError> {
        self.require_authority(caller)?;
        self.authority = new_authority;
        Ok(())
    }

    // ========================================================================
    // PRIVILEGED OPERATIONS (authority or governor)
    // ========================================================================

    /// Release one payee's owed amount.
    pub fn release(
        &mut self,
        caller: &IdentityId,
        payee: &IdentityId,
    ) -> Result<Amount, AdmissionError> {
        self.require_privileged(caller)?;
        if self.refund_active {
            return Err(AdmissionError::RefundActive);
        }
        if self.splitter.balance() == 0 {
            return Err(AdmissionError::NothingDue);
        }
        Ok(self.splitter.release(payee)?)
    }

    /// Release every payee's owed amount; returns the payouts made.
    pub fn release_all(
        &mut self,
        caller: &IdentityId,
    ) -> Result<Vec<(IdentityId, Amount)>, AdmissionError> {
        self.require_privileged(caller)?;
        if self.refund_active {
            return Err(AdmissionError::RefundActive);
        }
        if self.splitter.balance() == 0 {
            return Err(AdmissionError::NothingDue);
        }
        Ok(self.splitter.release_all()?)
    }

    /// Activate the refund: minting and releases freeze permanently and
    /// refund claims open. The phase drops to `Disabled`.
    pub fn activate_refund(&mut self, caller: &IdentityId) -> Result<(), AdmissionError> {
        self.require_privileged(caller)?;
        if self.refund_active {
            return Err(AdmissionError::RefundActive);
        }
        self.refund_active = true;
        self.phase = MintPhase::Disabled;
        Ok(())
    }

    /// Claim back everything the caller ever paid. Retires their slots
    /// from the live supply and clears their records; a second claim finds
    /// nothing due.
    pub fn claim_refund(&mut self, caller: IdentityId) -> Result<Amount, AdmissionError> {
        if !self.refund_active {
            return Err(AdmissionError::RefundNotActive);
        }
        let owed = self.paid.get(&caller).copied().unwrap_or(0);
        if owed == 0 {
            return Err(AdmissionError::NothingDue);
        }
        let slots = self.holdings.get(&caller).copied().unwrap_or(0);

        self.splitter.debit(owed)?;
        self.supply.retire(slots)?;
        self.paid.remove(&caller);
        self.holdings.remove(&caller);
        Ok(owed)
    }

    // ========================================================================
    // READ OPERATIONS
    // ========================================================================

    pub fn authority(&self) -> &IdentityId {
        &self.authority
    }

    pub fn governor(&self) -> Option<&IdentityId> {
        self.governor.as_ref()
    }

    pub fn phase(&self) -> MintPhase {
        self.phase
    }

    pub fn unit_price(&self) -> Amount {
        self.config.unit_price
    }

    pub fn per_transaction_cap(&self) -> u64 {
        self.config.per_transaction_cap
    }

    pub fn per_identity_whitelist_cap(&self) -> u64 {
        self.config.per_identity_whitelist_cap
    }

    pub fn whitelist_root(&self) -> Option<&RootHash> {
        self.config.whitelist_root.as_ref()
    }

    /// Funds currently held by the splitter
    pub fn balance(&self) -> Amount {
        self.splitter.balance()
    }

    /// Live supply (issued minus refunded)
    pub fn live_supply(&self) -> u64 {
        self.supply.live_supply()
    }

    pub fn supply_cap(&self) -> u64 {
        self.supply.cap()
    }

    pub fn issued(&self) -> u64 {
        self.supply.issued()
    }

    pub fn refund_active(&self) -> bool {
        self.refund_active
    }

    /// Slots an identity has claimed through the whitelist path
    pub fn whitelist_claimed(&self, identity: &IdentityId) -> u64 {
        self.whitelist_claimed.get(identity).copied().unwrap_or(0)
    }

    /// Live slots held by an identity
    pub fn holdings_of(&self, identity: &IdentityId) -> u64 {
        self.holdings.get(identity).copied().unwrap_or(0)
    }

    /// Total an identity has paid in
    pub fn paid_by(&self, identity: &IdentityId) -> Amount {
        self.paid.get(identity).copied().unwrap_or(0)
    }

    /// Voting weight of one identity: live slots held
    pub fn voting_power(&self, identity: &IdentityId) -> u64 {
        self.holdings_of(identity)
    }

    /// Snapshot of all voting weights, for proposal creation
    pub fn voting_snapshot(&self) -> HashMap<IdentityId, u64> {
        self.holdings
            .iter()
            .filter(|(_, slots)| **slots > 0)
            .map(|(id, slots)| (*id, *slots))
            .collect()
    }

    /// Total voting weight: the live supply
    pub fn total_voting_power(&self) -> u64 {
        self.supply.live_supply()
    }

    /// The payment splitter ledger
    pub fn splitter(&self) -> &PaymentSplitter {
        &self.splitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_crypto::merkle::MerkleTree;

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

    fn royalty() -> IdentityId {
        id(4)
    }

    /// Controller shaped like a standard deployment: 10000-slot cap, fee
    /// per slot, platform wallet holding 500 of 10000 shares.
    fn deploy() -> MintController {
        MintController::new(
            owner(),
            MintConfig {
                unit_price: FEE,
                per_transaction_cap: 1,
                per_identity_whitelist_cap: 1,
                whitelist_root: None,
            },
            10_000,
            &[(platform(), 500), (owner(), 5_000), (royalty(), 4_500)],
        )
        .unwrap()
    }

    fn open_public(controller: &mut MintController) {
        controller.set_phase(&owner(), MintPhase::PublicOpen).unwrap();
    }

    // ===== PHASE GATING =====

    #[test]
    fn test_minting_disabled_on_initialization() {
        let mut controller = deploy();
        assert_eq!(controller.phase(), MintPhase::Disabled);
        assert_eq!(
            controller.public_mint(buyer(), 1, FEE).unwrap_err(),
            AdmissionError::PhaseInactive {
                phase: MintPhase::Disabled
            }
        );
    }

    #[test]
    fn test_enable_and_disable_minting() {
        let mut controller = deploy();
        open_public(&mut controller);
        assert_eq!(controller.phase(), MintPhase::PublicOpen);
        controller.public_mint(buyer(), 1, FEE).unwrap();

        controller.set_phase(&owner(), MintPhase::Disabled).unwrap();
        assert!(matches!(
            controller.public_mint(buyer(), 1, FEE),
            Err(AdmissionError::PhaseInactive { .. })
        ));
    }

    #[test]
    fn test_public_mint_rejected_while_whitelist_open() {
        let mut controller = deploy();
        controller
            .set_phase(&owner(), MintPhase::WhitelistOpen)
            .unwrap();
        assert_eq!(
            controller.public_mint(buyer(), 1, FEE).unwrap_err(),
            AdmissionError::PhaseInactive {
                phase: MintPhase::WhitelistOpen
            }
        );
    }

    #[test]
    fn test_only_authority_can_set_phase() {
        let mut controller = deploy();
        assert_eq!(
            controller
                .set_phase(&buyer(), MintPhase::PublicOpen)
                .unwrap_err(),
            AdmissionError::AuthorityRequired
        );
    }

    // ===== PAYMENT =====

    #[test]
    fn test_exact_payment_enforced() {
        let mut controller = deploy();
        open_public(&mut controller);
        controller.set_per_transaction_cap(&owner(), 10).unwrap();

        for n in [1u64, 3, 7] {
            let exact = FEE * n as Amount;
            assert_eq!(
                controller.public_mint(buyer(), n, exact - 1).unwrap_err(),
                AdmissionError::WrongPayment {
                    expected: exact,
                    paid: exact - 1
                }
            );
            assert_eq!(
                controller.public_mint(buyer(), n, exact + 1).unwrap_err(),
                AdmissionError::WrongPayment {
                    expected: exact,
                    paid: exact + 1
                }
            );
            controller.public_mint(buyer(), n, exact).unwrap();
        }
    }

    #[test]
    fn test_failed_payment_leaves_no_state() {
        let mut controller = deploy();
        open_public(&mut controller);
        let _ = controller.public_mint(buyer(), 1, 999);
        assert_eq!(controller.live_supply(), 0);
        assert_eq!(controller.balance(), 0);
        assert_eq!(controller.holdings_of(&buyer()), 0);
    }

    // ===== CAPS =====

    #[test]
    fn test_per_transaction_cap() {
        let mut controller = deploy();
        open_public(&mut controller);
        controller.set_per_transaction_cap(&owner(), 2).unwrap();

        controller.public_mint(buyer(), 1, FEE).unwrap();
        controller.public_mint(buyer(), 2, 2 * FEE).unwrap();
        assert_eq!(
            controller.public_mint(buyer(), 3, 3 * FEE).unwrap_err(),
            AdmissionError::ExceedsMaxTransactionMints {
                requested: 3,
                cap: 2
            }
        );
    }

    #[test]
    fn test_supply_cap_respected() {
        let mut controller = MintController::new(
            owner(),
            MintConfig {
                unit_price: FEE,
                per_transaction_cap: 100,
                per_identity_whitelist_cap: 1,
                whitelist_root: None,
            },
            10,
            &[(platform(), 500), (owner(), 9_500)],
        )
        .unwrap();
        open_public(&mut controller);

        controller.public_mint(buyer(), 7, 7 * FEE).unwrap();
        assert_eq!(
            controller.public_mint(buyer(), 4, 4 * FEE).unwrap_err(),
            AdmissionError::CapExceeded {
                requested: 4,
                available: 3
            }
        );
        // The failed mint allocated nothing and kept no payment
        assert_eq!(controller.live_supply(), 7);
        assert_eq!(controller.balance(), 7 * FEE);

        controller.public_mint(buyer(), 3, 3 * FEE).unwrap();
        assert_eq!(controller.live_supply(), 10);
    }

    #[test]
    fn test_zero_mint_rejected() {
        let mut controller = deploy();
        open_public(&mut controller);
        assert_eq!(
            controller.public_mint(buyer(), 0, 0).unwrap_err(),
            AdmissionError::ZeroMint
        );
    }

    // ===== BALANCES =====

    #[test]
    fn test_balance_after_single_mints() {
        let mut controller = deploy();
        open_public(&mut controller);
        for _ in 0..3 {
            controller.public_mint(buyer(), 1, FEE).unwrap();
        }
        assert_eq!(controller.balance(), 3 * FEE);
    }

    #[test]
    fn test_balance_after_batch_mints() {
        let mut controller = deploy();
        open_public(&mut controller);
        controller.set_per_transaction_cap(&owner(), 100).unwrap();

        controller.public_mint(buyer(), 5, 5 * FEE).unwrap();
        controller.public_mint(buyer(), 45, 45 * FEE).unwrap();
        controller.public_mint(buyer(), 50, 50 * FEE).unwrap();
        assert_eq!(controller.balance(), 100 * FEE);
        assert_eq!(controller.live_supply(), 100);
    }

    // ===== WHITELIST =====

    #[test]
    fn test_non_whitelisted_identity_cannot_mint() {
        let mut controller = deploy();
        let tree = MerkleTree::from_identities(&[owner()]).unwrap();
        controller.set_whitelist_root(&owner(), tree.root()).unwrap();
        controller
            .set_phase(&owner(), MintPhase::WhitelistOpen)
            .unwrap();

        // The stranger holds the owner's proof, which cannot admit them
        let proof = tree.proof_for(&owner()).unwrap();
        assert_eq!(
            controller
                .whitelist_mint(buyer(), &proof, 1, FEE)
                .unwrap_err(),
            AdmissionError::NotWhitelisted
        );
    }

    #[test]
    fn test_whitelisted_identity_can_mint_once() {
        let mut controller = deploy();
        let tree = MerkleTree::from_identities(&[owner()]).unwrap();
        controller.set_whitelist_root(&owner(), tree.root()).unwrap();
        controller
            .set_phase(&owner(), MintPhase::WhitelistOpen)
            .unwrap();

        let proof = tree.proof_for(&owner()).unwrap();
        controller.whitelist_mint(owner(), &proof, 1, FEE).unwrap();
        assert_eq!(controller.whitelist_claimed(&owner()), 1);

        // Allowance exhausted: the same identity cannot claim again
        assert_eq!(
            controller
                .whitelist_mint(owner(), &proof, 1, FEE)
                .unwrap_err(),
            AdmissionError::ExceedsMaxWhitelistMints {
                claimed: 1,
                requested: 1,
                cap: 1
            }
        );
    }

    #[test]
    fn test_whitelist_mint_respects_per_identity_cap() {
        let mut controller = deploy();
        controller.set_per_transaction_cap(&owner(), 10).unwrap();
        let tree = MerkleTree::from_identities(&[owner()]).unwrap();
        controller.set_whitelist_root(&owner(), tree.root()).unwrap();
        controller
            .set_phase(&owner(), MintPhase::WhitelistOpen)
            .unwrap();

        let proof = tree.proof_for(&owner()).unwrap();
        assert_eq!(
            controller
                .whitelist_mint(owner(), &proof, 2, 2 * FEE)
                .unwrap_err(),
            AdmissionError::ExceedsMaxWhitelistMints {
                claimed: 0,
                requested: 2,
                cap: 1
            }
        );
    }

    #[test]
    fn test_replacing_root_admits_new_members() {
        let mut controller = deploy();
        let tree = MerkleTree::from_identities(&[owner()]).unwrap();
        controller.set_whitelist_root(&owner(), tree.root()).unwrap();
        controller
            .set_phase(&owner(), MintPhase::WhitelistOpen)
            .unwrap();

        // Replace the root with one that includes the buyer
        let wider = MerkleTree::from_identities(&[owner(), buyer()]).unwrap();
        controller.set_whitelist_root(&owner(), wider.root()).unwrap();

        let proof = wider.proof_for(&buyer()).unwrap();
        controller.whitelist_mint(buyer(), &proof, 1, FEE).unwrap();
        assert_eq!(controller.whitelist_claimed(&buyer()), 1);
    }

    #[test]
    fn test_whitelist_mint_without_root_fails() {
        let mut controller = deploy();
        controller
            .set_phase(&owner(), MintPhase::WhitelistOpen)
            .unwrap();
        assert_eq!(
            controller
                .whitelist_mint(owner(), &MerkleProof::default(), 1, FEE)
                .unwrap_err(),
            AdmissionError::NotWhitelisted
        );
    }

    // ===== RELEASES =====

    #[test]
    fn test_release_requires_balance() {
        let mut controller = deploy();
        assert_eq!(
            controller.release_all(&owner()).unwrap_err(),
            AdmissionError::NothingDue
        );
    }

    #[test]
    fn test_release_requires_privilege() {
        let mut controller = deploy();
        open_public(&mut controller);
        controller.public_mint(buyer(), 1, FEE).unwrap();
        assert_eq!(
            controller.release_all(&buyer()).unwrap_err(),
            AdmissionError::AuthorityRequired
        );
    }

    #[test]
    fn test_release_all_pays_by_shares() {
        let mut controller = deploy();
        open_public(&mut controller);
        controller.set_per_transaction_cap(&owner(), 100).unwrap();
        controller.public_mint(buyer(), 100, 100 * FEE).unwrap();

        let payouts = controller.release_all(&owner()).unwrap();
        let total: Amount = payouts.iter().map(|(_, amount)| amount).sum();
        assert_eq!(total, 100 * FEE);
        assert_eq!(controller.balance(), 0);

        assert_eq!(controller.splitter().released_to(&platform()), 5 * FEE);
        assert_eq!(controller.splitter().released_to(&owner()), 50 * FEE);
        assert_eq!(controller.splitter().released_to(&royalty()), 45 * FEE);
    }

    // ===== REFUNDS =====

    #[test]
    fn test_refund_lifecycle() {
        let mut controller = deploy();
        open_public(&mut controller);
        controller.set_per_transaction_cap(&owner(), 2).unwrap();
        controller.public_mint(buyer(), 2, 2 * FEE).unwrap();

        controller.activate_refund(&owner()).unwrap();
        assert!(controller.refund_active());
        assert_eq!(controller.phase(), MintPhase::Disabled);

        // Minting and releasing are frozen
        assert_eq!(
            controller.public_mint(buyer(), 1, FEE).unwrap_err(),
            AdmissionError::RefundActive
        );
        assert_eq!(
            controller.release_all(&owner()).unwrap_err(),
            AdmissionError::RefundActive
        );

        let refunded = controller.claim_refund(buyer()).unwrap();
        assert_eq!(refunded, 2 * FEE);
        assert_eq!(controller.balance(), 0);
        assert_eq!(controller.live_supply(), 0);

        // A second claim finds nothing
        assert_eq!(
            controller.claim_refund(buyer()).unwrap_err(),
            AdmissionError::NothingDue
        );
    }

    #[test]
    fn test_claim_refund_requires_active_refund() {
        let mut controller = deploy();
        open_public(&mut controller);
        controller.public_mint(buyer(), 1, FEE).unwrap();
        assert_eq!(
            controller.claim_refund(buyer()).unwrap_err(),
            AdmissionError::RefundNotActive
        );
    }

    #[test]
    fn test_governor_can_release_and_refund() {
        let mut controller = deploy();
        let gov = id(9);
        controller.set_governor(&owner(), gov).unwrap();
        open_public(&mut controller);
        controller.public_mint(buyer(), 1, FEE).unwrap();

        controller.release_all(&gov).unwrap();
        controller.activate_refund(&gov).unwrap();
        assert!(controller.refund_active());
    }

    // ===== RECONFIGURATION =====

    #[test]
    fn test_supply_cap_locked_after_first_mint() {
        let mut controller = deploy();
        controller.set_supply_cap(&owner(), 50).unwrap();
        open_public(&mut controller);
        controller.public_mint(buyer(), 1, FEE).unwrap();
        assert_eq!(
            controller.set_supply_cap(&owner(), 100).unwrap_err(),
            AdmissionError::ReconfigurationLocked
        );
    }

    #[test]
    fn test_add_payee_locked_after_first_release() {
        let mut controller = deploy();
        open_public(&mut controller);
        controller.public_mint(buyer(), 1, FEE).unwrap();
        controller.release_all(&owner()).unwrap();
        assert_eq!(
            controller.add_payee(&owner(), id(8), 1_000).unwrap_err(),
            AdmissionError::ReconfigurationLocked
        );
    }

    #[test]
    fn test_set_unit_price() {
        let mut controller = deploy();
        controller.set_unit_price(&owner(), 10 * FEE).unwrap();
        assert_eq!(controller.unit_price(), 10 * FEE);
        assert_eq!(
            controller.set_unit_price(&buyer(), FEE).unwrap_err(),
            AdmissionError::AuthorityRequired
        );
    }

    #[test]
    fn test_transfer_authority() {
        let mut controller = deploy();
        controller.transfer_authority(&owner(), buyer()).unwrap();
        assert_eq!(controller.authority(), &buyer());
        assert_eq!(
            controller.set_phase(&owner(), MintPhase::PublicOpen).unwrap_err(),
            AdmissionError::AuthorityRequired
        );
        controller.set_phase(&buyer(), MintPhase::PublicOpen).unwrap();
    }

    // ===== VOTING POWER =====

    #[test]
    fn test_voting_snapshot_tracks_holdings() {
        let mut controller = deploy();
        open_public(&mut controller);
        controller.set_per_transaction_cap(&owner(), 100).unwrap();
        controller.public_mint(buyer(), 60, 60 * FEE).unwrap();
        controller.public_mint(royalty(), 40, 40 * FEE).unwrap();

        assert_eq!(controller.voting_power(&buyer()), 60);
        assert_eq!(controller.total_voting_power(), 100);

        let snapshot = controller.voting_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&buyer()], 60);
        assert_eq!(snapshot[&royalty()], 40);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut controller = deploy();
        open_public(&mut controller);
        controller.public_mint(buyer(), 1, FEE).unwrap();

        let json = serde_json::to_string(&controller).unwrap();
        let back: MintController = serde_json::from_str(&json).unwrap();
        assert_eq!(back.live_supply(), 1);
        assert_eq!(back.balance(), FEE);
        assert_eq!(back.phase(), MintPhase::PublicOpen);
    }
}
