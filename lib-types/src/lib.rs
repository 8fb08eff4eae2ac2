//! Mintgate primitives.
//! Stable, protocol-neutral, behavior-free.
//!
//! Rule: No String identifiers in ledger state. Ever.

pub mod errors;
pub mod primitives;

pub use errors::ParseError;
pub use primitives::{Amount, Bps, IdentityId, ProposalId, RootHash, ShareWeight, TickHeight};
