//! Pull-based payment splitting for Mintgate
//!
//! Tracks proportional claims ("shares") against accumulated funds and
//! exposes pull-based withdrawal with exact-remainder accounting. Payees
//! must actively release to receive funds; nothing is pushed.

pub mod ledger;

pub use ledger::{PaymentSplitter, SplitterError};
