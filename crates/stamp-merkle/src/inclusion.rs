use serde::{Deserialize, Serialize};
use stamp_crypto::{combine_values, from_leaf, Hash, SupportedDigest};

use crate::cache::NodeCache;
use crate::engine::calculate_node;
use crate::error::MerkleError;
use crate::oracle::LeafOracle;

/// `(path_bits, sibling_digests)` witnessing that leaf `leaf_index` occurs
/// in a tree of width `tree_width` (spec.md Glossary "Inclusion proof").
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct InclusionProof<D: SupportedDigest> {
    pub leaf_index: u64,
    pub tree_width: u64,
    pub path: u64,
    pub neighbours: Vec<Hash<D>>,
}

/// Computes the inclusion proof for leaf `x` in a tree of width `n`
/// (spec.md §4.B, the bit-manipulation walk). The asymmetric handling of a
/// missing sibling — `continue` without consuming a path bit — is required
/// for non-power-of-two widths and must not be "simplified" away.
pub fn compute_inclusion_proof<D: SupportedDigest>(
    oracle: &dyn LeafOracle<D>,
    cache: &dyn NodeCache<D>,
    x: u64,
    n: u64,
) -> Result<InclusionProof<D>, MerkleError> {
    let mut cur = calculate_node(oracle, cache, x, x + 1)?;
    let mut read_bit: u64 = 1;
    let mut write_bit: u64 = 1;
    let mut width_step: u64 = 1;
    let mut path: u64 = 0;
    let mut neighbours = Vec::new();

    loop {
        if cur.start == 0 && cur.end == n {
            break;
        }

        let sibling = if cur.start & read_bit == 0 {
            let other_end = n.min(cur.end + width_step);
            if cur.end != other_end {
                Some(calculate_node(oracle, cache, cur.end, other_end)?)
            } else {
                None
            }
        } else {
            let other_start = cur.start.saturating_sub(width_step);
            if cur.start != other_start {
                path |= write_bit;
                Some(calculate_node(oracle, cache, other_start, cur.start)?)
            } else {
                None
            }
        };

        width_step *= 2;
        read_bit <<= 1;

        let Some(sib) = sibling else {
            continue;
        };
        if sib.start == 0 && sib.end == n {
            break;
        }

        write_bit <<= 1;
        neighbours.push(sib.value.clone());
        let new_start = cur.start.min(sib.start);
        let new_end = cur.end.max(sib.end);
        cur = calculate_node(oracle, cache, new_start, new_end)?;
    }

    Ok(InclusionProof {
        leaf_index: x,
        tree_width: n,
        path,
        neighbours,
    })
}

/// Recomputes the `path` bitfield for leaf `x` in a tree of width `n` from
/// addresses alone, with no oracle or cache needed: every decision in the
/// walk (whether a sibling exists, when to stop) is arithmetic on
/// `(start, end)` pairs, never on hash values. This lets a wire format omit
/// `path` entirely (spec.md §6's attached proof structure carries only `a`
/// and the sibling digests) — a verifier re-derives it from `a` and the
/// tree width it already knows from the head it is checking against.
pub fn derive_path_bits(x: u64, n: u64) -> u64 {
    let mut cur_start = x;
    let mut cur_end = x + 1;
    let mut read_bit: u64 = 1;
    let mut write_bit: u64 = 1;
    let mut width_step: u64 = 1;
    let mut path: u64 = 0;

    loop {
        if cur_start == 0 && cur_end == n {
            break;
        }

        let sibling = if cur_start & read_bit == 0 {
            let other_end = n.min(cur_end + width_step);
            (cur_end != other_end).then_some((cur_end, other_end))
        } else {
            let other_start = cur_start.saturating_sub(width_step);
            if cur_start != other_start {
                path |= write_bit;
                Some((other_start, cur_start))
            } else {
                None
            }
        };

        width_step *= 2;
        read_bit <<= 1;

        let Some((sib_start, sib_end)) = sibling else {
            continue;
        };
        if sib_start == 0 && sib_end == n {
            break;
        }

        write_bit <<= 1;
        cur_start = cur_start.min(sib_start);
        cur_end = cur_end.max(sib_end);
    }

    path
}

/// Verifies an inclusion proof against an expected root, given the
/// canonical leaf bytes for position `x` (spec.md §4.B "Inclusion-proof
/// verification"). Walks siblings bottom-up; `path & 1 == 0` means the
/// sibling is on the right of the accumulator, else on the left.
pub fn verify_inclusion_proof<D: SupportedDigest>(
    leaf_index: u64,
    leaf_bytes: &[u8],
    proof: &InclusionProof<D>,
    expected_root: &Hash<D>,
) -> bool {
    if proof.leaf_index != leaf_index {
        return false;
    }
    let mut acc = from_leaf::<D>(leaf_index, leaf_bytes).value;
    let mut path = proof.path;
    for sibling in &proof.neighbours {
        acc = if path & 1 == 0 {
            combine_values(&acc, sibling)
        } else {
            combine_values(sibling, &acc)
        };
        path >>= 1;
    }
    acc == *expected_root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoCache;
    use crate::engine::tree_root;
    use crate::oracle::SliceOracle;
    use sha2::Sha512;

    fn leaves(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| vec![i as u8; (i % 3) + 1]).collect()
    }

    #[test]
    fn width_7_address_vectors() {
        let data = leaves(7);
        let oracle = SliceOracle::new(&data);

        let p0: InclusionProof<Sha512> = compute_inclusion_proof(&oracle, &NoCache, 0, 7).unwrap();
        assert_eq!(p0.path, 0);

        let p1: InclusionProof<Sha512> = compute_inclusion_proof(&oracle, &NoCache, 1, 7).unwrap();
        assert_eq!(p1.path, 1);

        let p6: InclusionProof<Sha512> = compute_inclusion_proof(&oracle, &NoCache, 6, 7).unwrap();
        assert_eq!(p6.path, 3);
    }

    #[test]
    fn every_leaf_in_every_width_verifies() {
        for n in 1..25u64 {
            let data = leaves(n as usize);
            let oracle = SliceOracle::new(&data);
            let root: stamp_crypto::MerkleNode<Sha512> = tree_root(&oracle, &NoCache, n).unwrap();
            for x in 0..n {
                let proof = compute_inclusion_proof(&oracle, &NoCache, x, n).unwrap();
                assert!(
                    verify_inclusion_proof(x, &data[x as usize], &proof, &root.value),
                    "leaf {x} in width {n} failed to verify"
                );
            }
        }
    }

    #[test]
    fn derived_path_bits_match_the_computed_proof() {
        for n in 1..20u64 {
            for x in 0..n {
                let data = leaves(n as usize);
                let oracle = SliceOracle::new(&data);
                let proof: InclusionProof<Sha512> =
                    compute_inclusion_proof(&oracle, &NoCache, x, n).unwrap();
                assert_eq!(derive_path_bits(x, n), proof.path, "x={x} n={n}");
            }
        }
    }

    #[test]
    fn flipping_a_sibling_bit_falsifies_verification() {
        let data = leaves(7);
        let oracle = SliceOracle::new(&data);
        let root: stamp_crypto::MerkleNode<Sha512> = tree_root(&oracle, &NoCache, 7).unwrap();
        let mut proof = compute_inclusion_proof(&oracle, &NoCache, 3, 7).unwrap();
        let mut corrupted = proof.neighbours[0].bytes().to_vec();
        corrupted[0] ^= 0x01;
        proof.neighbours[0] = corrupted.try_into().unwrap();
        assert!(!verify_inclusion_proof(3, &data[3], &proof, &root.value));
    }
}
