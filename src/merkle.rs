// 2.0 merkle.rs: SHA-256 merkle machinery for batch commitments.
// node hashing is pair-sorted, so a proof is just the sibling list and
// verification never needs left/right bookkeeping.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::Hash32;

pub fn sha256(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);

    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash32::new(out)
}

// 2.1: order-independent pair hash. the smaller digest always goes first,
// so combine(a, b) == combine(b, a) at every level of the tree.
pub fn combine_sorted(a: Hash32, b: Hash32) -> Hash32 {
    let (lo, hi) = if a.as_bytes() <= b.as_bytes() {
        (a, b)
    } else {
        (b, a)
    };

    let mut hasher = Sha256::new();
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());

    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash32::new(out)
}

// 2.2: membership proof. sibling hashes from the leaf up to (not including)
// the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub siblings: Vec<Hash32>,
}

impl MerkleProof {
    pub fn new(siblings: Vec<Hash32>) -> Self {
        Self { siblings }
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

// 2.3: fold the leaf through the sibling path and compare against the root.
// pure, no state, usable by any third party holding the batch's public root.
pub fn verify_proof(leaf: Hash32, proof: &MerkleProof, root: Hash32) -> bool {
    let mut acc = leaf;
    for sibling in &proof.siblings {
        acc = combine_sorted(acc, *sibling);
    }
    acc == root
}

// 2.4: in-memory tree builder. the production tree is built off-system; this
// one exists for the sim binary and for tests, and must stay byte-compatible
// with the verification fold above. odd levels duplicate the last node.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    // levels[0] is the leaf layer, last level holds the single root
    levels: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    pub fn from_leaves(leaves: &[Hash32]) -> Self {
        if leaves.is_empty() {
            return Self { levels: Vec::new() };
        }

        let mut levels = vec![leaves.to_vec()];
        while levels.last().map(|l| l.len()).unwrap_or(0) > 1 {
            let current = levels.last().cloned().unwrap_or_default();
            let mut next = Vec::with_capacity((current.len() + 1) / 2);

            for pair in current.chunks(2) {
                let left = pair[0];
                let right = if pair.len() == 2 { pair[1] } else { pair[0] };
                next.push(combine_sorted(left, right));
            }

            levels.push(next);
        }

        Self { levels }
    }

    pub fn root(&self) -> Hash32 {
        self.levels
            .last()
            .and_then(|l| l.first())
            .copied()
            .unwrap_or(Hash32::ZERO)
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(|l| l.len()).unwrap_or(0)
    }

    // sibling path for the leaf at `index`. None when the index is out of range.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut siblings = Vec::new();
        let mut i = index;

        // walk every layer below the root
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = i ^ 1;
            let sibling = if sibling_index < level.len() {
                level[sibling_index]
            } else {
                // odd tail duplicates itself, same as the builder
                level[i]
            };
            siblings.push(sibling);
            i /= 2;
        }

        Some(MerkleProof::new(siblings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u8) -> Hash32 {
        sha256(&[n])
    }

    #[test]
    fn combine_is_order_independent() {
        let a = leaf(1);
        let b = leaf(2);
        assert_eq!(combine_sorted(a, b), combine_sorted(b, a));
        assert_ne!(combine_sorted(a, b), combine_sorted(a, a));
    }

    #[test]
    fn empty_tree_has_zero_root() {
        let tree = MerkleTree::from_leaves(&[]);
        assert_eq!(tree.root(), Hash32::ZERO);
        assert!(tree.proof(0).is_none());
    }

    #[test]
    fn single_leaf_root_is_the_leaf() {
        let l = leaf(7);
        let tree = MerkleTree::from_leaves(&[l]);
        assert_eq!(tree.root(), l);

        let proof = tree.proof(0).unwrap();
        assert_eq!(proof.depth(), 0);
        assert!(verify_proof(l, &proof, tree.root()));
    }

    #[test]
    fn four_leaf_proofs_verify() {
        let leaves: Vec<Hash32> = (0..4).map(leaf).collect();
        let tree = MerkleTree::from_leaves(&leaves);

        for (i, l) in leaves.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert_eq!(proof.depth(), 2);
            assert!(verify_proof(*l, &proof, tree.root()), "leaf {} failed", i);
        }
    }

    #[test]
    fn odd_leaf_count_proofs_verify() {
        let leaves: Vec<Hash32> = (0..5).map(leaf).collect();
        let tree = MerkleTree::from_leaves(&leaves);

        for (i, l) in leaves.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(verify_proof(*l, &proof, tree.root()), "leaf {} failed", i);
        }
    }

    #[test]
    fn wrong_leaf_fails() {
        let leaves: Vec<Hash32> = (0..4).map(leaf).collect();
        let tree = MerkleTree::from_leaves(&leaves);

        let proof = tree.proof(2).unwrap();
        assert!(!verify_proof(leaf(9), &proof, tree.root()));
    }

    #[test]
    fn wrong_root_fails() {
        let leaves: Vec<Hash32> = (0..4).map(leaf).collect();
        let tree = MerkleTree::from_leaves(&leaves);

        let proof = tree.proof(1).unwrap();
        assert!(!verify_proof(leaves[1], &proof, leaf(42)));
    }

    #[test]
    fn tampered_sibling_fails() {
        let leaves: Vec<Hash32> = (0..8).map(leaf).collect();
        let tree = MerkleTree::from_leaves(&leaves);

        let mut proof = tree.proof(3).unwrap();
        proof.siblings[1] = leaf(99);
        assert!(!verify_proof(leaves[3], &proof, tree.root()));
    }

    #[test]
    fn large_tree_all_indices() {
        let leaves: Vec<Hash32> = (0..100).map(|i| sha256(&[i as u8, (i >> 8) as u8])).collect();
        let tree = MerkleTree::from_leaves(&leaves);

        for (i, l) in leaves.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(verify_proof(*l, &proof, tree.root()), "leaf {} failed", i);
        }
    }
}
