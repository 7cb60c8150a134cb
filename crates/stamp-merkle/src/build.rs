use std::collections::HashMap;

use stamp_crypto::{combine, empty_tree, from_leaf, Hash, MerkleNode, SupportedDigest};

/// Bottom-up stack build (spec.md §4.B "From-sequence build"): push each new
/// leaf, combine the top two stack entries while they have equal height,
/// then fold any remainder right-to-left. Returns the root plus every
/// intermediate `(start, end) -> value` produced, for seeding a cache
/// (spec.md §4.C "Seeding").
pub fn from_sequence<D: SupportedDigest>(
    leaves: &[Vec<u8>],
) -> (MerkleNode<D>, HashMap<(u64, u64), Hash<D>>) {
    let mut seed = HashMap::new();
    if leaves.is_empty() {
        return (empty_tree(), seed);
    }

    let mut stack: Vec<MerkleNode<D>> = Vec::new();
    for (i, bytes) in leaves.iter().enumerate() {
        let leaf = from_leaf(i as u64, bytes);
        seed.insert((leaf.start, leaf.end), leaf.value.clone());
        stack.push(leaf);

        while stack.len() >= 2 && stack[stack.len() - 1].height() == stack[stack.len() - 2].height()
        {
            let right = stack.pop().unwrap();
            let left = stack.pop().unwrap();
            let combined = combine(&left, &right);
            seed.insert((combined.start, combined.end), combined.value.clone());
            stack.push(combined);
        }
    }

    let mut acc = stack.pop().expect("at least one leaf was pushed");
    while let Some(left) = stack.pop() {
        acc = combine(&left, &acc);
        seed.insert((acc.start, acc.end), acc.value.clone());
    }

    (acc, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoCache;
    use crate::engine::tree_root;
    use crate::oracle::SliceOracle;
    use sha2::Sha512;

    #[test]
    fn from_sequence_root_matches_calculate_node() {
        for n in 0..20usize {
            let leaves: Vec<Vec<u8>> = (0..n).map(|i| vec![i as u8; (i % 5) + 1]).collect();
            let (root, _seed): (MerkleNode<Sha512>, _) = from_sequence(&leaves);
            let oracle = SliceOracle::new(&leaves);
            let direct: MerkleNode<Sha512> = tree_root(&oracle, &NoCache, n as u64).unwrap();
            assert_eq!(root.value, direct.value, "mismatch at width {n}");
        }
    }

    #[test]
    fn seed_dict_contains_every_intermediate_address() {
        let leaves: Vec<Vec<u8>> = vec![b"A".to_vec(), b"BB".to_vec(), b"CCC".to_vec(), b"DDDD".to_vec()];
        let (_root, seed): (MerkleNode<Sha512>, _) = from_sequence(&leaves);
        for addr in [(0u64, 1u64), (1, 2), (2, 3), (3, 4), (0, 2), (2, 4), (0, 4)] {
            assert!(seed.contains_key(&addr), "missing address {addr:?}");
        }
    }
}
