//! Mintgate cryptography
//!
//! Provides BLAKE3 hashing and Merkle membership verification used by the
//! admission controller and the governance engine.
//!
//! **BLAKE3 is the canonical hash function for all commitment data.**
//! This includes membership leaves, published roots, and proposal ids.

pub mod hashing;
pub mod merkle;

pub use hashing::{canonical_hash, hash_blake3, hash_blake3_multiple, CANONICAL_HASH_FUNCTION};
pub use merkle::{leaf_hash, verify_membership, MerkleProof, MerkleTree, MerkleTreeError};
