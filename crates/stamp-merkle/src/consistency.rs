use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use stamp_crypto::{combine_values, Hash, SupportedDigest};

use crate::cache::NodeCache;
use crate::engine::{calculate_node, split_point};
use crate::error::MerkleError;
use crate::oracle::LeafOracle;

/// An ordered list of node digests witnessing that a tree of width `n` is a
/// clean extension of a tree of width `m` (spec.md Glossary "Consistency
/// proof"). The addresses are not transmitted — both producer and verifier
/// derive them from `(m, n)` alone via [`addrs`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ConsistencyProof<D: SupportedDigest> {
    pub old_width: u64,
    pub new_width: u64,
    pub nodes: Vec<Hash<D>>,
}

fn ceil_log2(n: u64) -> u32 {
    debug_assert!(n >= 1);
    if n == 1 {
        0
    } else {
        u64::BITS - (n - 1).leading_zeros()
    }
}

fn subnodes(m: u64, n: u64, flag: bool, off: u64, out: &mut Vec<(u64, u64)>) {
    if n == m {
        if !flag {
            out.push((off, off + n));
        }
        return;
    }
    let k = 1u64 << (ceil_log2(n) - 1);
    if m <= k {
        subnodes(m, k, flag, off, out);
        out.push((off + k, off + n));
    } else {
        subnodes(m - k, n - k, false, off + k, out);
        out.push((off, off + k));
    }
}

/// `addrs(m, n) = subnodes(m, n, true, 0)` (spec.md §4.B). The ordering of
/// yielded addresses is part of the contract and must be preserved.
pub fn addrs(m: u64, n: u64) -> Vec<(u64, u64)> {
    let mut out = Vec::new();
    subnodes(m, n, true, 0, &mut out);
    out
}

pub fn compute_consistency_proof<D: SupportedDigest>(
    oracle: &dyn LeafOracle<D>,
    cache: &dyn NodeCache<D>,
    m: u64,
    n: u64,
) -> Result<ConsistencyProof<D>, MerkleError> {
    let mut nodes = Vec::new();
    for (a, b) in addrs(m, n) {
        nodes.push(calculate_node(oracle, cache, a, b)?.value);
    }
    Ok(ConsistencyProof {
        old_width: m,
        new_width: n,
        nodes,
    })
}

/// Reconstructs `(a, b)` from the proof's node map by recursing through the
/// same [`split_point`] the engine itself uses — the reason the address
/// enumeration and the split rule must never diverge (spec.md §4.B).
fn resolve<D: SupportedDigest>(
    map: &HashMap<(u64, u64), Hash<D>>,
    a: u64,
    b: u64,
) -> Result<Hash<D>, MerkleError> {
    if let Some(v) = map.get(&(a, b)) {
        return Ok(v.clone());
    }
    if b - a <= 1 {
        return Err(MerkleError::MalformedProof(format!(
            "consistency proof has no node covering ({a}, {b})"
        )));
    }
    let mid = split_point(a, b);
    let left = resolve(map, a, mid)?;
    let right = resolve(map, mid, b)?;
    Ok(combine_values(&left, &right))
}

/// Verifies a consistency proof between an old tree (width `m`, root
/// `old_root`) and a new tree (width `n`, root `new_root`) (spec.md §4.B
/// "Consistency-proof verification"). When `m` is a power of two the old
/// root is implicitly known and is not carried in `proof.nodes` — it is
/// injected here before reconstruction, exactly as spec.md step 2 describes.
pub fn verify_consistency_proof<D: SupportedDigest>(
    m: u64,
    old_root: &Hash<D>,
    n: u64,
    new_root: &Hash<D>,
    proof: &ConsistencyProof<D>,
) -> Result<bool, MerkleError> {
    if m == n {
        return Ok(old_root == new_root);
    }
    let addresses = addrs(m, n);
    if addresses.len() != proof.nodes.len() {
        return Err(MerkleError::MalformedProof(format!(
            "expected {} proof nodes for addrs({m}, {n}), got {}",
            addresses.len(),
            proof.nodes.len()
        )));
    }

    let mut map: HashMap<(u64, u64), Hash<D>> = addresses
        .into_iter()
        .zip(proof.nodes.iter().cloned())
        .collect();
    if m.is_power_of_two() {
        map.insert((0, m), old_root.clone());
    }

    let reconstructed_old = resolve(&map, 0, m)?;
    let reconstructed_new = resolve(&map, 0, n)?;
    Ok(reconstructed_old == *old_root && reconstructed_new == *new_root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_vectors() {
        assert_eq!(addrs(3, 7), vec![(2, 3), (3, 4), (0, 2), (4, 7)]);
        assert_eq!(addrs(4, 7), vec![(4, 7)]);
        assert_eq!(addrs(6, 7), vec![(4, 6), (6, 7), (0, 4)]);
    }

    #[test]
    fn compute_and_verify_round_trip() {
        use crate::cache::NoCache;
        use crate::engine::tree_root;
        use crate::oracle::SliceOracle;
        use sha2::Sha512;

        for n in 2..15u64 {
            for m in 1..=n {
                let leaves: Vec<Vec<u8>> = (0..n).map(|i| vec![i as u8]).collect();
                let oracle = SliceOracle::new(&leaves);
                let old_root: stamp_crypto::MerkleNode<Sha512> =
                    tree_root(&oracle, &NoCache, m).unwrap();
                let new_root: stamp_crypto::MerkleNode<Sha512> =
                    tree_root(&oracle, &NoCache, n).unwrap();
                let proof = compute_consistency_proof(&oracle, &NoCache, m, n).unwrap();
                assert!(
                    verify_consistency_proof(m, &old_root.value, n, &new_root.value, &proof)
                        .unwrap(),
                    "m={m} n={n} failed"
                );
            }
        }
    }
}
