//! The two-level Merkle tree engine: node computation, inclusion proofs,
//! consistency proofs, and the from-sequence bulk-build (spec.md §4.B).
//!
//! This crate is deliberately storage-agnostic: [`LeafOracle`] supplies leaf
//! bytes on demand and [`NodeCache`] memoizes inner nodes; `stamp-cache`
//! supplies the real cache-backed implementation used by the main tree,
//! while the interval tree within one scheduler tick just uses
//! [`NoCache`] plus [`from_sequence`].

mod build;
mod cache;
mod consistency;
mod engine;
mod error;
mod inclusion;
mod oracle;

pub use build::from_sequence;
pub use cache::{NoCache, NodeCache};
pub use consistency::{addrs, compute_consistency_proof, verify_consistency_proof, ConsistencyProof};
pub use engine::{calculate_node, tree_root};
pub use error::MerkleError;
pub use inclusion::{
    compute_inclusion_proof, derive_path_bits, verify_inclusion_proof, InclusionProof,
};
pub use oracle::{LeafOracle, SliceOracle};
