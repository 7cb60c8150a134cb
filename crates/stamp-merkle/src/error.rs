use thiserror::Error;

/// Errors raised while materializing or verifying nodes of the tree engine
/// (spec.md §7: the engine itself only ever surfaces `CacheCorruption` and
/// `ProofMismatch`-shaped failures; `StoreConflict`/`Transient` belong to the
/// scheduler and store layers above this crate).
#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("leaf oracle failed to produce bytes for leaf {index}: {source}")]
    Oracle {
        index: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("node cache disagrees with a freshly computed value at ({start}, {end})")]
    CacheCorruption { start: u64, end: u64 },

    #[error("node cache backend error: {0}")]
    CacheBackend(#[source] anyhow::Error),

    #[error("malformed consistency proof: {0}")]
    MalformedProof(String),

    #[error("produced proof failed self-verification: {0}")]
    ProofMismatch(String),
}
