//! Payment splitter ledger
//!
//! Implements deterministic pull-based splitting of accumulated funds
//! across a fixed set of weighted payees.
//!
//! # Design Principles
//!
//! This is a **pure accounting module**: no transport, no identities beyond
//! opaque keys, no knowledge of where credits come from.
//! - Input: credits (amounts received) and release requests
//! - Output: amounts owed and paid per payee
//! - Side effects: None outside the ledger itself
//!
//! The entitlement of a payee is always computed from the all-time received
//! total, never from the current balance:
//!
//! ```text
//! due = floor(total_received * weight / total_shares) - released[payee]
//! ```
//!
//! This formula guarantees:
//! - the sum of all-time releases never exceeds total_received, even with
//!   integer truncation
//! - releases already paid out are never re-priced by later credits
//! - the order of release calls does not affect the converged totals once
//!   the balance is fully drained
//!
//! # Integer Math
//!
//! All calculations use integer arithmetic for deterministic results and
//! predictable remainder handling. After every payee has drained, at most
//! `payee_count - 1` atomic units remain as truncation residue.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use lib_types::{Amount, IdentityId, ShareWeight};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors for payment splitter operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitterError {
    /// A splitter needs at least one payee
    NoPayees,

    /// The same identity was registered twice
    DuplicatePayee(IdentityId),

    /// A payee cannot hold zero shares
    ZeroShares(IdentityId),

    /// The identity is not a registered payee
    UnknownPayee(IdentityId),

    /// Nothing is currently owed to the payee
    NothingDue,

    /// Payees cannot be added once releases have begun
    ReleasesBegun,

    /// The balance does not cover the requested amount
    InsufficientBalance { needed: Amount, available: Amount },

    /// Arithmetic overflow
    Overflow,
}

impl fmt::Display for SplitterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitterError::NoPayees => write!(f, "at least one payee is required"),
            SplitterError::DuplicatePayee(id) => write!(f, "duplicate payee {}", id),
            SplitterError::ZeroShares(id) => write!(f, "payee {} has zero shares", id),
            SplitterError::UnknownPayee(id) => write!(f, "unknown payee {}", id),
            SplitterError::NothingDue => write!(f, "nothing due"),
            SplitterError::ReleasesBegun => write!(f, "payees cannot change after releases begin"),
            SplitterError::InsufficientBalance { needed, available } => write!(
                f,
                "insufficient balance: needed {} available {}",
                needed, available
            ),
            SplitterError::Overflow => write!(f, "arithmetic overflow"),
        }
    }
}

impl std::error::Error for SplitterError {}

// ============================================================================
// LEDGER
// ============================================================================

/// Pull-based payment splitter.
///
/// Payees are registered at construction in a stable order (append-only
/// afterwards via [`PaymentSplitter::add_payee`]). Credits accumulate into a
/// balance; each payee pulls its proportional entitlement with
/// [`PaymentSplitter::release`].
///
/// # Invariants
///
/// - `total_received` is monotonic, incremented on every credit
/// - `sum(released) <= total_received` for every call sequence
/// - `balance == total_received - sum(released) - sum(debits)`
/// - `total_shares == sum(shares)` and only grows, never shrinks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSplitter {
    /// Payees in registration order
    payees: Vec<IdentityId>,

    /// Share weight per payee
    shares: HashMap<IdentityId, ShareWeight>,

    /// Sum of all share weights
    total_shares: ShareWeight,

    /// All-time released amount per payee
    released: HashMap<IdentityId, Amount>,

    /// Sum of all releases ever made
    total_released: Amount,

    /// All-time received total; never decreases
    total_received: Amount,

    /// Funds currently held
    balance: Amount,

    /// Set on the first release; locks the payee table
    releases_begun: bool,
}

impl PaymentSplitter {
    /// Create a splitter over an ordered payee table.
    ///
    /// # Errors
    ///
    /// - `NoPayees` if the table is empty
    /// - `DuplicatePayee` if an identity appears twice
    /// - `ZeroShares` if any weight is zero
    pub fn new(payees: &[(IdentityId, ShareWeight)]) -> Result<Self, SplitterError> {
        if payees.is_empty() {
            return Err(SplitterError::NoPayees);
        }

        let mut ordered = Vec::with_capacity(payees.len());
        let mut shares = HashMap::with_capacity(payees.len());
        let mut total_shares: ShareWeight = 0;

        for (identity, weight) in payees {
            if *weight == 0 {
                return Err(SplitterError::ZeroShares(*identity));
            }
            if shares.insert(*identity, *weight).is_some() {
                return Err(SplitterError::DuplicatePayee(*identity));
            }
            ordered.push(*identity);
            total_shares = total_shares
                .checked_add(*weight)
                .ok_or(SplitterError::Overflow)?;
        }

        Ok(Self {
            payees: ordered,
            shares,
            total_shares,
            released: HashMap::new(),
            total_released: 0,
            total_received: 0,
            balance: 0,
            releases_begun: false,
        })
    }

    // ========================================================================
    // CREDITS AND DEBITS
    // ========================================================================

    /// Record funds received. Raises the all-time total and the balance.
    pub fn credit(&mut self, amount: Amount) -> Result<(), SplitterError> {
        self.total_received = self
            .total_received
            .checked_add(amount)
            .ok_or(SplitterError::Overflow)?;
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(SplitterError::Overflow)?;
        Ok(())
    }

    /// Withdraw funds outside the share formula (refund payouts).
    ///
    /// Lowers the balance only; `total_received` stays untouched, so the
    /// caller must stop routing releases through this ledger afterwards.
    pub fn debit(&mut self, amount: Amount) -> Result<(), SplitterError> {
        if amount > self.balance {
            return Err(SplitterError::InsufficientBalance {
                needed: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    // ========================================================================
    // RELEASES
    // ========================================================================

    /// Amount currently owed to a payee.
    ///
    /// # Errors
    ///
    /// - `UnknownPayee` if the identity is not registered
    pub fn releasable(&self, payee: &IdentityId) -> Result<Amount, SplitterError> {
        let weight = *self
            .shares
            .get(payee)
            .ok_or(SplitterError::UnknownPayee(*payee))?;

        let entitled = self
            .total_received
            .checked_mul(weight as Amount)
            .ok_or(SplitterError::Overflow)?
            / self.total_shares as Amount;

        let already = self.released.get(payee).copied().unwrap_or(0);
        Ok(entitled.saturating_sub(already))
    }

    /// Pay out everything currently owed to a payee.
    ///
    /// # Errors
    ///
    /// - `UnknownPayee` if the identity is not registered
    /// - `NothingDue` if the owed amount or the balance is zero
    pub fn release(&mut self, payee: &IdentityId) -> Result<Amount, SplitterError> {
        let due = self.releasable(payee)?;
        if due == 0 || self.balance == 0 {
            return Err(SplitterError::NothingDue);
        }
        if due > self.balance {
            return Err(SplitterError::InsufficientBalance {
                needed: due,
                available: self.balance,
            });
        }

        self.balance -= due;
        self.total_released = self
            .total_released
            .checked_add(due)
            .ok_or(SplitterError::Overflow)?;
        *self.released.entry(*payee).or_insert(0) += due;
        self.releases_begun = true;

        Ok(due)
    }

    /// Release every payee with a non-zero entitlement.
    ///
    /// Returns the individual payouts in payee registration order. Payees
    /// with nothing due are skipped, not failed.
    pub fn release_all(&mut self) -> Result<Vec<(IdentityId, Amount)>, SplitterError> {
        let mut payouts = Vec::new();
        for payee in self.payees.clone() {
            match self.release(&payee) {
                Ok(amount) => payouts.push((payee, amount)),
                Err(SplitterError::NothingDue) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(payouts)
    }

    // ========================================================================
    // PAYEE TABLE
    // ========================================================================

    /// Append a payee, growing the total shares.
    ///
    /// # Errors
    ///
    /// - `ReleasesBegun` once any release has happened; allowing a late
    ///   payee after payouts would re-price entitlements already computed
    /// - `DuplicatePayee` / `ZeroShares` as at construction
    pub fn add_payee(
        &mut self,
        identity: IdentityId,
        weight: ShareWeight,
    ) -> Result<(), SplitterError> {
        if self.releases_begun {
            return Err(SplitterError::ReleasesBegun);
        }
        if weight == 0 {
            return Err(SplitterError::ZeroShares(identity));
        }
        if self.shares.contains_key(&identity) {
            return Err(SplitterError::DuplicatePayee(identity));
        }

        self.total_shares = self
            .total_shares
            .checked_add(weight)
            .ok_or(SplitterError::Overflow)?;
        self.shares.insert(identity, weight);
        self.payees.push(identity);
        Ok(())
    }

    // ========================================================================
    // READ OPERATIONS
    // ========================================================================

    /// Payee at a registration index
    pub fn payee(&self, index: usize) -> Option<&IdentityId> {
        self.payees.get(index)
    }

    /// All payees in registration order
    pub fn payees(&self) -> &[IdentityId] {
        &self.payees
    }

    /// Share weight held by an identity (0 for strangers)
    pub fn shares_of(&self, identity: &IdentityId) -> ShareWeight {
        self.shares.get(identity).copied().unwrap_or(0)
    }

    /// Sum of all share weights
    pub fn total_shares(&self) -> ShareWeight {
        self.total_shares
    }

    /// All-time received total
    pub fn total_received(&self) -> Amount {
        self.total_received
    }

    /// All-time released total
    pub fn total_released(&self) -> Amount {
        self.total_released
    }

    /// All-time amount released to one payee
    pub fn released_to(&self, identity: &IdentityId) -> Amount {
        self.released.get(identity).copied().unwrap_or(0)
    }

    /// Funds currently held
    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Whether any release has happened yet
    pub fn releases_begun(&self) -> bool {
        self.releases_begun
    }
}
