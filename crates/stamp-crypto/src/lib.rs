//! Domain-separated hashing and canonical digest encoding.
//!
//! `Hash<D>` wraps a digest output for a [`SupportedDigest`]; [`VisitBytes`]
//! lets composite values (tuples of prefixes, digests, byte slices) stream
//! into a hasher without an intermediate allocation.

mod encoding;
pub mod hash;
mod node;
mod visit_bytes;

pub use encoding::{b64url_decode, b64url_encode};
pub use hash::{Hash, HashAlgorithm, SupportedDigest};
pub use node::{combine, combine_values, empty_tree, from_leaf, MerkleNode};
pub use visit_bytes::{ByteVisitor, VisitBytes};

pub use digest::{Digest, Output};
pub use sha2::Sha512;

/// Domain-separation prefix for leaf hashes: `H(0x00 || canonical bytes)`.
pub const LEAF_PREFIX: u8 = 0x00;

/// Domain-separation prefix for inner-node hashes: `H(0x01 || left || right)`.
pub const INNER_PREFIX: u8 = 0x01;
