//! Supply ledger
//!
//! Monotonic counter of issued slots with a hard cap. Owns the uniqueness
//! of every issued slot id: each reservation allocates a contiguous range,
//! ids are never reused, and retired (refunded) slots shrink the live
//! supply without rewinding the counter.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors for supply ledger operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplyError {
    /// The reservation would push issuance past the cap
    CapExceeded { requested: u64, available: u64 },

    /// A reservation must cover at least one slot
    ZeroReservation,

    /// More slots retired than are live
    RetireExceedsSupply { requested: u64, live: u64 },

    /// The cap cannot change once issuance has begun
    ReconfigurationLocked,

    /// Arithmetic overflow
    Overflow,
}

impl fmt::Display for SupplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupplyError::CapExceeded { requested, available } => write!(
                f,
                "supply cap exceeded: requested {} with {} available",
                requested, available
            ),
            SupplyError::ZeroReservation => write!(f, "reservation must cover at least one slot"),
            SupplyError::RetireExceedsSupply { requested, live } => write!(
                f,
                "cannot retire {} slots with only {} live",
                requested, live
            ),
            SupplyError::ReconfigurationLocked =>
                write!(f, "supply cap is locked once issuance has begun"),
            SupplyError::Overflow => write!(f, "arithmetic overflow"),
        }
    }
}

impl std::error::Error for SupplyError {}

// ============================================================================
// TYPE DEFINITIONS
// ============================================================================

/// Contiguous range of issued slot ids, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRange {
    pub start: u64,
    pub end: u64,
}

impl SlotRange {
    /// Number of slots in the range
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Iterate the slot ids in the range
    pub fn iter(&self) -> impl Iterator<Item = u64> {
        self.start..self.end
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// Capped monotonic slot issuance ledger.
///
/// Not internally synchronized; the check-and-advance in
/// [`SupplyLedger::reserve`] must not race with concurrent reservations.
///
/// # Invariants
///
/// - `issued <= cap` after every operation
/// - `issued` never decreases; retired slot ids are not reused
/// - `burned <= issued`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyLedger {
    /// Hard cap on total issuance
    cap: u64,

    /// Next slot id to issue; also the count of slots ever issued
    issued: u64,

    /// Count of slots retired via refunds
    burned: u64,
}

impl SupplyLedger {
    /// Create a ledger with a hard cap
    pub fn new(cap: u64) -> Self {
        Self {
            cap,
            issued: 0,
            burned: 0,
        }
    }

    /// Atomically reserve `n` contiguous slots.
    ///
    /// On success the counter advances by `n` and the allocated range is
    /// returned. On failure nothing changes; there is no partial
    /// allocation.
    ///
    /// # Errors
    ///
    /// - `ZeroReservation` if `n == 0`
    /// - `CapExceeded` if `issued + n > cap`
    pub fn reserve(&mut self, n: u64) -> Result<SlotRange, SupplyError> {
        if n == 0 {
            return Err(SupplyError::ZeroReservation);
        }
        let end = self.issued.checked_add(n).ok_or(SupplyError::Overflow)?;
        if end > self.cap {
            return Err(SupplyError::CapExceeded {
                requested: n,
                available: self.cap - self.issued,
            });
        }

        let range = SlotRange {
            start: self.issued,
            end,
        };
        self.issued = end;
        Ok(range)
    }

    /// Retire `n` live slots (refund path). The issuance counter is not
    /// rewound; retired ids stay consumed.
    pub fn retire(&mut self, n: u64) -> Result<(), SupplyError> {
        let live = self.live_supply();
        if n > live {
            return Err(SupplyError::RetireExceedsSupply { requested: n, live });
        }
        self.burned += n;
        Ok(())
    }

    /// Replace the cap. Only allowed while nothing has been issued.
    pub fn set_cap(&mut self, cap: u64) -> Result<(), SupplyError> {
        if self.issued > 0 {
            return Err(SupplyError::ReconfigurationLocked);
        }
        self.cap = cap;
        Ok(())
    }

    /// The configured hard cap
    pub fn cap(&self) -> u64 {
        self.cap
    }

    /// Count of slots ever issued
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Slots still available for issuance
    pub fn remaining(&self) -> u64 {
        self.cap - self.issued
    }

    /// Live supply: issued minus retired
    pub fn live_supply(&self) -> u64 {
        self.issued - self.burned
    }
}
