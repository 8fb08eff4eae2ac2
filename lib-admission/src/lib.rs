//! Mintgate admission control
//!
//! Gates requests to acquire sequential supply slots: phase checks, exact
//! payment metering, per-transaction and per-identity caps, Merkle-proof
//! whitelist membership, and the privileged release/refund operations.
//!
//! # Key Principles
//!
//! 1. **All-or-nothing**: every check precedes the first state write; a
//!    failed operation mutates nothing
//! 2. **Single writer**: the controller is not internally synchronized;
//!    callers must serialize mutation (one lock or one actor per instance)
//! 3. **Composition over inheritance**: the supply ledger, payment splitter
//!    and membership verifier are independent parts assembled here

pub mod controller;
pub mod supply;

pub use controller::{AdmissionError, MintConfig, MintController, MintPhase};
pub use supply::{SlotRange, SupplyError, SupplyLedger};
