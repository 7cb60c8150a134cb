use thiserror::Error;

/// The error taxonomy of spec.md §7.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Malformed submission; rejected at the boundary, never reaches the
    /// core. Nothing in this crate constructs this today — intake
    /// validation is an external collaborator's job — but the variant is
    /// kept so a boundary layer has somewhere to route it through the same
    /// taxonomy.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialisation failure on the scheduler transaction; retry next tick.
    #[error("store conflict, will retry next tick: {0}")]
    StoreConflict(String),

    /// Cached value disagrees with a freshly computed value. Fatal; refuse
    /// to publish until the operator purges the cache.
    #[error("cache corruption at ({start}, {end}): operator must purge the node cache")]
    CacheCorruption { start: u64, end: u64 },

    /// A produced proof failed its own self-check. Fatal; refuse to publish.
    #[error("produced proof failed self-verification: {0}")]
    ProofMismatch(String),

    /// Store, cache, or broadcast sink unavailable. Logged and retried; does
    /// not advance the interval index.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl From<stamp_merkle::MerkleError> for SchedulerError {
    fn from(e: stamp_merkle::MerkleError) -> Self {
        match e {
            stamp_merkle::MerkleError::CacheCorruption { start, end } => {
                SchedulerError::CacheCorruption { start, end }
            }
            other => SchedulerError::Transient(other.to_string()),
        }
    }
}

impl From<stamp_schema::SchemaError> for SchedulerError {
    fn from(e: stamp_schema::SchemaError) -> Self {
        SchedulerError::Transient(e.to_string())
    }
}
