use crate::error::MerkleError;

/// A capability that, given a position `0 <= i < width`, returns the
/// canonical leaf bytes for leaf `i` (spec.md §4.B). The engine never stores
/// leaf data itself; backends hide the storage (submission store, or a
/// pre-hashed list of interval-tree heads for the main tree) behind this
/// trait, per spec.md §9's note to use dynamic dispatch here.
pub trait LeafOracle<D> {
    fn leaf_bytes(&self, index: u64) -> Result<Vec<u8>, MerkleError>;
}

/// A leaf oracle backed by an in-memory slice, used for bulk-building an
/// interval tree from already-fetched submission leaf hashes, and in tests.
pub struct SliceOracle<'a> {
    leaves: &'a [Vec<u8>],
}

impl<'a> SliceOracle<'a> {
    pub fn new(leaves: &'a [Vec<u8>]) -> Self {
        Self { leaves }
    }
}

impl<'a, D> LeafOracle<D> for SliceOracle<'a> {
    fn leaf_bytes(&self, index: u64) -> Result<Vec<u8>, MerkleError> {
        self.leaves
            .get(index as usize)
            .cloned()
            .ok_or_else(|| MerkleError::Oracle {
                index,
                source: anyhow::anyhow!("leaf index out of range (width {})", self.leaves.len()),
            })
    }
}
