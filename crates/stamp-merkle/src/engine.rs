use stamp_crypto::{combine, empty_tree, from_leaf, MerkleNode, SupportedDigest};

use crate::cache::NodeCache;
use crate::error::MerkleError;
use crate::oracle::LeafOracle;

/// The RFC-6962-style split point for `[a, b)`: the largest power of two
/// strictly less than `b - a`, offset so the left subtree is perfect
/// (spec.md §4.B). Identical on every code path — build, inclusion proof,
/// and consistency proof — which is what makes those paths cross-verifiable.
pub(crate) fn split_point(a: u64, b: u64) -> u64 {
    let k = u64::BITS - (a ^ (b - 1)).leading_zeros();
    a + (1u64 << (k - 1))
}

/// `calculate_node(a, b)`: the tree root is `calculate_node(0, width)`.
///
/// Consults `cache` first; on a miss, recurses and then writes the freshly
/// computed value back (spec.md §4.C read/write policy). A cache hit that
/// disagrees with oracle-recomputed leaves can never be detected here (the
/// whole point of caching is to avoid recomputing) — disagreement is only
/// observable by a caller that deliberately recomputes without the cache and
/// compares, which the scheduler's self-verification step does.
pub fn calculate_node<D: SupportedDigest>(
    oracle: &dyn LeafOracle<D>,
    cache: &dyn NodeCache<D>,
    a: u64,
    b: u64,
) -> Result<MerkleNode<D>, MerkleError> {
    debug_assert!(a < b, "calculate_node requires a non-empty range");
    if let Some(value) = cache.get(a, b)? {
        return Ok(MerkleNode {
            start: a,
            end: b,
            value,
        });
    }

    let node = if b - a == 1 {
        from_leaf(a, &oracle.leaf_bytes(a)?)
    } else {
        let m = split_point(a, b);
        let left = calculate_node(oracle, cache, a, m)?;
        let right = calculate_node(oracle, cache, m, b)?;
        combine(&left, &right)
    };

    cache.put(a, b, node.value.clone())?;
    Ok(node)
}

/// `root = calculate_node(0, width)`, with the width-0 empty-tree special
/// case from spec.md §3 ("Empty tree") handled here rather than inside
/// `calculate_node`, which assumes a non-empty range.
pub fn tree_root<D: SupportedDigest>(
    oracle: &dyn LeafOracle<D>,
    cache: &dyn NodeCache<D>,
    width: u64,
) -> Result<MerkleNode<D>, MerkleError> {
    if width == 0 {
        Ok(empty_tree())
    } else {
        calculate_node(oracle, cache, 0, width)
    }
}
