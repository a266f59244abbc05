//! Incremental binary Merkle tree builder used within one block.
//!
//! Leaves are appended one at a time; whenever two equal-height
//! subtrees meet they combine into the next height up (a "carry", like
//! ripple-carry addition). [`MerkleForest::finalize`] folds whatever
//! subtree roots remain into the block's single Merkle root.

use crate::engine::SignatureEngine;
use crate::imprint::Imprint;

/// Upper bound on simultaneous subtree slots — enough for 2^64 leaves
/// in a single block, far beyond anything a conforming writer produces.
pub const MAX_ROOTS: usize = 64;

/// An intermediate node the forest produced while combining two
/// subtrees, alongside the tree level it sits at and the two operands
/// that produced it. The block verifier only needs `node`; the
/// extractor (see [`crate::extractor`]) needs `left`/`right` to tell
/// which operand was which when it's walking a particular leaf's path.
///
/// `left` is always the structurally earlier (lower-index) operand,
/// `right` the later one — independent of whether this combination
/// happened mid-append or during [`MerkleForest::finalize`]'s fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarryNode {
    /// Tree level of the resulting node (leaves are level 1).
    pub level: u8,
    /// The earlier (lower-index) operand.
    pub left: Imprint,
    /// The later (higher-index) operand.
    pub right: Imprint,
    /// The node's hash.
    pub node: Imprint,
}

/// The forest's slot array: `slots[j]`, when occupied, holds the root
/// of a subtree at level `j + 1`.
#[derive(Debug, Default)]
pub struct MerkleForest {
    slots: Vec<Option<Imprint>>,
    n_leaves: u64,
}

impl MerkleForest {
    /// An empty forest, ready to receive the first leaf.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            n_leaves: 0,
        }
    }

    /// Number of leaves appended so far.
    #[must_use]
    pub fn leaf_count(&self) -> u64 {
        self.n_leaves
    }

    /// Append one leaf hash, returning the carry nodes produced, in the
    /// order they were computed (lowest level first).
    pub fn append<E: SignatureEngine>(
        &mut self,
        leaf: Imprint,
        engine: &E,
    ) -> Result<Vec<CarryNode>, E::Err> {
        let mut produced = Vec::new();
        let mut carry = leaf;
        let mut j = 0usize;
        loop {
            if j == self.slots.len() {
                self.slots.push(None);
            }
            match self.slots[j].take() {
                None => {
                    self.slots[j] = Some(carry);
                    break;
                }
                Some(existing) => {
                    let level = (j + 2) as u8;
                    let combined = engine.hash_node(&existing, &carry, level)?;
                    produced.push(CarryNode {
                        level,
                        left: existing,
                        right: carry,
                        node: combined.clone(),
                    });
                    carry = combined;
                    j += 1;
                }
            }
        }
        self.n_leaves += 1;
        Ok(produced)
    }

    /// Fold all remaining valid slots into the block's canonical root.
    /// Returns `None` if no leaves were ever appended, alongside every
    /// fold combination performed (in the order they were computed), for
    /// callers (the extractor) that need to keep tracking a leaf's path
    /// past the last incremental append.
    ///
    /// Slots fold from lowest to highest occupied index: the running
    /// accumulator acts as the left child at each step, the next
    /// higher slot's root as the right child, with the level taken
    /// from that slot's own index (`j + 2`), matching [`Self::append`].
    pub fn finalize<E: SignatureEngine>(
        &mut self,
        engine: &E,
    ) -> Result<(Option<Imprint>, Vec<CarryNode>), E::Err> {
        let mut produced = Vec::new();
        let mut acc: Option<Imprint> = None;
        for j in 0..self.slots.len() {
            let Some(root) = self.slots[j].take() else {
                continue;
            };
            let level = (j + 2) as u8;
            acc = Some(match acc {
                None => root,
                Some(acc_root) => {
                    let combined = engine.hash_node(&acc_root, &root, level)?;
                    produced.push(CarryNode {
                        level,
                        left: acc_root,
                        right: root,
                        node: combined.clone(),
                    });
                    combined
                }
            });
        }
        Ok((acc, produced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;

    #[test]
    fn single_leaf_is_its_own_root() {
        let engine = MockEngine::new();
        let mut forest = MerkleForest::new();
        let leaf = Imprint::new(0x01, vec![0x11; 32]);
        let carries = forest.append(leaf.clone(), &engine).unwrap();
        assert!(carries.is_empty());
        let (root, fold_carries) = forest.finalize(&engine).unwrap();
        assert_eq!(root.unwrap(), leaf);
        assert!(fold_carries.is_empty());
    }

    #[test]
    fn two_leaves_produce_one_carry() {
        let engine = MockEngine::new();
        let mut forest = MerkleForest::new();
        let a = Imprint::new(0x01, vec![0xAA; 32]);
        let b = Imprint::new(0x01, vec![0xBB; 32]);

        assert!(forest.append(a.clone(), &engine).unwrap().is_empty());
        let carries = forest.append(b.clone(), &engine).unwrap();
        assert_eq!(carries.len(), 1);
        assert_eq!(carries[0].level, 2);

        let expected = engine.hash_node(&a, &b, 2).unwrap();
        assert_eq!(carries[0].node, expected);

        let (root, fold_carries) = forest.finalize(&engine).unwrap();
        assert_eq!(root.unwrap(), expected);
        assert!(fold_carries.is_empty());
    }

    #[test]
    fn empty_forest_has_no_root() {
        let engine = MockEngine::new();
        let mut forest = MerkleForest::new();
        assert_eq!(forest.finalize(&engine).unwrap().0, None);
    }

    #[test]
    fn three_leaves_leave_two_slots_to_fold() {
        let engine = MockEngine::new();
        let mut forest = MerkleForest::new();
        for byte in [0x01u8, 0x02, 0x03] {
            forest.append(Imprint::new(0x01, vec![byte; 32]), &engine).unwrap();
        }
        assert_eq!(forest.leaf_count(), 3);
        let (root, fold_carries) = forest.finalize(&engine).unwrap();
        assert!(root.is_some());
        assert_eq!(fold_carries.len(), 1);
    }
}
