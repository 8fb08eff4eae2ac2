//! Mintgate service
//!
//! Assembles one admission-and-accounting instance (controller + governor
//! engine), serializes all mutation through a single-writer actor, and
//! exposes a request/response handle for mint, verify, release, refund,
//! administrative, and governance operations.

pub mod config;
pub mod error;
pub mod instance;
pub mod service;

pub use config::{GovernanceParams, InstanceSpec, PayeeSpec, PLATFORM_SHARES, TOTAL_SHARES};
pub use error::ServiceError;
pub use instance::Instance;
pub use service::{spawn, AdminOp, InstanceHandle, InstanceStatus, MintReceipt};
