//! Service-level errors
//!
//! Wraps the typed core errors so the request/response API surfaces one
//! taxonomy. Proof material arriving as hex is decoded at this boundary;
//! wrong-length siblings surface as `MalformedProof` before verification
//! ever runs.

use thiserror::Error;

use lib_admission::AdmissionError;
use lib_governance::GovernanceError;

/// Error returned through the service handle
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("snapshot failed: {0}")]
    Snapshot(String),

    #[error("service is shut down")]
    Closed,
}

impl ServiceError {
    /// Whether this is the admission-layer error `expected`
    pub fn is_admission(&self, expected: &AdmissionError) -> bool {
        matches!(self, ServiceError::Admission(e) if e == expected)
    }
}
