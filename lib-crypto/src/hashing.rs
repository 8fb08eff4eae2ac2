//! Hashing module for Mintgate cryptography
//!
//! Provides BLAKE3 hashing functionality used throughout the system.
//!
//! All commitment-critical data (membership leaves, Merkle roots, proposal
//! ids) MUST be hashed with BLAKE3. Using an alternate hash for commitment
//! objects causes mismatched roots and breaks proof verification.

use blake3;

/// The canonical hash function for all commitment-critical data.
pub const CANONICAL_HASH_FUNCTION: &str = "BLAKE3";

/// Computes the canonical hash of `data` using BLAKE3.
///
/// Use this for any data that enters a commitment path.
pub fn canonical_hash(data: &[u8]) -> [u8; 32] {
    blake3::hash(data).into()
}

/// BLAKE3 hash function - primary hash function for Mintgate
pub fn hash_blake3(data: &[u8]) -> [u8; 32] {
    let hash = blake3::hash(data);
    hash.into()
}

/// Hash multiple data segments
pub fn hash_blake3_multiple(data_segments: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for segment in data_segments {
        hasher.update(segment);
    }
    hasher.finalize().into()
}
