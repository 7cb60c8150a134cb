//! `MerkleNode` and the domain-separated leaf/inner hashing rules (spec.md
//! §3 "MerkleNode", §4.A).

use crate::hash::{Hash, SupportedDigest};
use crate::{VisitBytes, INNER_PREFIX, LEAF_PREFIX};

/// A node's identity is exactly its address `(start, end)`; two nodes at the
/// same address must carry the same `value` (spec.md I1).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MerkleNode<D: SupportedDigest> {
    pub start: u64,
    pub end: u64,
    pub value: Hash<D>,
}

impl<D: SupportedDigest> MerkleNode<D> {
    /// `0` for the empty sentinel, else `ceil(log2(end - start)) + 1`.
    pub fn height(&self) -> u32 {
        if self.start == self.end {
            return 0;
        }
        let width = self.end - self.start;
        let ceil_log2 = if width <= 1 {
            0
        } else {
            u64::BITS - (width - 1).leading_zeros()
        };
        ceil_log2 + 1
    }

    pub fn width(&self) -> u64 {
        self.end - self.start
    }
}

/// `from_leaf`: `H(0x00 || canonical_bytes)`.
pub fn from_leaf<D: SupportedDigest>(index: u64, canonical_bytes: &[u8]) -> MerkleNode<D> {
    MerkleNode {
        start: index,
        end: index + 1,
        value: Hash::of(&(LEAF_PREFIX, canonical_bytes)),
    }
}

/// `H(0x01 || left || right)` over two raw digests, with no address bookkeeping.
///
/// This is what proof verification uses: a verifier only ever has digests,
/// not addresses, for the siblings along a path. [`combine`] is the
/// address-checked counterpart used while building or walking a tree whose
/// node addresses are known.
pub fn combine_values<D: SupportedDigest>(left: &Hash<D>, right: &Hash<D>) -> Hash<D> {
    Hash::of(&(INNER_PREFIX, left.bytes(), right.bytes()))
}

/// `combine(L, R)`: requires `L.end == R.start`; non-commutative.
///
/// # Panics
/// Panics if `left.end != right.start` — callers in this workspace only ever
/// combine adjacent nodes produced by the engine's own split rule, so a
/// mismatch here indicates a bug in the caller, not bad input data.
pub fn combine<D: SupportedDigest>(left: &MerkleNode<D>, right: &MerkleNode<D>) -> MerkleNode<D> {
    assert_eq!(
        left.end, right.start,
        "combine requires adjacent nodes: {}..{} vs {}..{}",
        left.start, left.end, right.start, right.end
    );
    MerkleNode {
        start: left.start,
        end: right.end,
        value: combine_values(&left.value, &right.value),
    }
}

/// `MerkleNode(0, 0, H(""))`.
pub fn empty_tree<D: SupportedDigest>() -> MerkleNode<D> {
    let empty: &[u8] = &[];
    MerkleNode {
        start: 0,
        end: 0,
        value: Hash::of(empty),
    }
}

impl<'a, D: SupportedDigest> VisitBytes for &'a MerkleNode<D> {
    fn visit<BV: ?Sized + crate::ByteVisitor>(&self, visitor: &mut BV) {
        visitor.visit_bytes(self.value.bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Sha512;

    #[test]
    fn height_of_leaf_is_one_empty_sentinel_is_zero() {
        let leaf: MerkleNode<Sha512> = from_leaf(0, b"");
        assert_eq!(leaf.height(), 1);
        let empty: MerkleNode<Sha512> = empty_tree();
        assert_eq!(empty.height(), 0);
    }

    #[test]
    fn empty_tree_hashes_empty_input() {
        let e: MerkleNode<Sha512> = empty_tree();
        let expected = hex::decode(
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9c\
             e47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e",
        )
        .unwrap();
        assert_eq!(e.value.bytes(), expected.as_slice());
    }

    #[test]
    #[should_panic]
    fn combine_rejects_non_adjacent_nodes() {
        let a: MerkleNode<Sha512> = from_leaf(0, b"x");
        let b: MerkleNode<Sha512> = from_leaf(5, b"y");
        combine(&a, &b);
    }
}
