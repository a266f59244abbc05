//! Extracting a single record's hash chain out of a block, for excerpt
//! signatures.
//!
//! Drives an independent [`MerkleForest`] replay of the block (the same
//! way [`crate::verifier::BlockSession`] does for full verification) and
//! tracks the one target leaf's position as it gets folded into larger
//! subtrees, recording the sibling at each combination it takes part in.
//! The wire format ([`HashChain`]) only has room for two such
//! combinations — the one nearest the leaf goes in `left`, the one
//! nearest the root in `right` — so blocks whose Merkle depth exceeds
//! that for the requested record are reported as
//! [`ErrorKind::ExtractHash`] rather than silently truncated.

use crate::engine::SignatureEngine;
use crate::error::{ErrorKind, LogSigError, Result};
use crate::forest::{CarryNode, MerkleForest};
use crate::imprint::Imprint;
use crate::objects::{BlockHeader, HashChain, Step};

struct Hop {
    is_left_type: bool,
    carry: CarryNode,
}

/// Replays one block's leaf sequence to build the [`HashChain`] for a
/// single target record.
pub struct Extractor<'e, E: SignatureEngine> {
    engine: &'e E,
    header: BlockHeader,
    forest: MerkleForest,
    target_index: u64,
    n_consumed: u64,
    leaf_hash: Option<Imprint>,
    frontier: Option<Imprint>,
    hops: Vec<Hop>,
}

impl<'e, E: SignatureEngine> Extractor<'e, E> {
    /// Start extracting the record at `target_index` (0-based within
    /// the block) from a block opened by `header`.
    #[must_use]
    pub fn new(engine: &'e E, header: BlockHeader, target_index: u64) -> Self {
        Self {
            engine,
            header,
            forest: MerkleForest::new(),
            target_index,
            n_consumed: 0,
            leaf_hash: None,
            frontier: None,
            hops: Vec::new(),
        }
    }

    /// Feed the next record in block order.
    pub fn observe_record(&mut self, rec_bytes: &[u8]) -> Result<()> {
        let leaf = self
            .engine
            .hash_leaf(
                self.header.hash_algo,
                &self.header.iv,
                &self.header.last_hash,
                self.n_consumed,
                rec_bytes,
            )
            .map_err(|e| {
                log::debug!("leaf hash computation failed during extraction: {e}");
                LogSigError::new(ErrorKind::CreateHash)
            })?;

        if self.n_consumed == self.target_index {
            self.leaf_hash = Some(leaf.clone());
            self.frontier = Some(leaf.clone());
        }

        let carries = self.forest.append(leaf, self.engine).map_err(|e| {
            log::debug!("tree node computation failed during extraction: {e}");
            LogSigError::new(ErrorKind::CreateHash)
        })?;
        for carry in carries {
            self.absorb(carry);
        }

        self.n_consumed += 1;
        Ok(())
    }

    fn absorb(&mut self, carry: CarryNode) {
        let Some(front) = self.frontier.clone() else {
            return;
        };
        if carry.right == front {
            self.hops.push(Hop {
                is_left_type: true,
                carry: carry.clone(),
            });
            self.frontier = Some(carry.node);
        } else if carry.left == front {
            self.hops.push(Hop {
                is_left_type: false,
                carry: carry.clone(),
            });
            self.frontier = Some(carry.node);
        }
    }

    /// Consume the block's terminating fold and produce the hash chain.
    pub fn finish(mut self) -> Result<HashChain> {
        if self.n_consumed <= self.target_index {
            return Err(LogSigError::new(ErrorKind::ExtractHash));
        }

        let (_root, fold_carries) = self.forest.finalize(self.engine).map_err(|e| {
            log::debug!("forest finalization failed during extraction: {e}");
            LogSigError::new(ErrorKind::CreateHash)
        })?;
        for carry in fold_carries {
            self.absorb(carry);
        }

        let leaf_hash = self
            .leaf_hash
            .ok_or_else(|| LogSigError::new(ErrorKind::ExtractHash))?;

        if self.hops.len() > 2 {
            log::debug!(
                "record {} needs {} combinations, more than a hash chain can carry",
                self.target_index,
                self.hops.len()
            );
            return Err(LogSigError::new(ErrorKind::ExtractHash));
        }

        let algo = self.header.hash_algo;
        let digest_len = self
            .engine
            .digest_length(algo)
            .ok_or_else(|| LogSigError::new(ErrorKind::ExtractHash))?;

        // Hops are absorbed in the order they actually occur along the
        // path from leaf to root, so the first one (nearest the leaf)
        // belongs in `left` and the second (nearest the root) in
        // `right` regardless of which side of the combination the
        // target sat on — that only decides which operand is the
        // sibling to record, not the hop's place in the chain. This
        // relies on `hash_node` treating its two operands symmetrically,
        // so reapplying a sibling whose geometric side we've discarded
        // still reproduces the original combination.
        let as_left_step = |hop: &Hop| -> Result<Step> {
            let sibling = if hop.is_left_type {
                hop.carry.left.clone()
            } else {
                hop.carry.right.clone()
            };
            let level_correction = hop
                .carry
                .level
                .checked_sub(1)
                .ok_or_else(|| LogSigError::new(ErrorKind::ExtractHash))?;
            Ok(Step {
                level_correction,
                sibling,
            })
        };
        let as_right_step = |hop: &Hop| -> Step {
            let sibling = if hop.is_left_type {
                hop.carry.left.clone()
            } else {
                hop.carry.right.clone()
            };
            Step {
                level_correction: hop.carry.level,
                sibling,
            }
        };

        let (record_hash, left, right) = match self.hops.as_slice() {
            [] => (
                leaf_hash,
                Step::none(algo, digest_len),
                Step::none(algo, digest_len),
            ),
            [hop] => (
                hop.carry.node.clone(),
                as_left_step(hop)?,
                Step::none(algo, digest_len),
            ),
            [first, second] => (
                first.carry.node.clone(),
                as_left_step(first)?,
                as_right_step(second),
            ),
            _ => unreachable!("checked hops.len() <= 2 above"),
        };

        Ok(HashChain {
            record_hash,
            left,
            right,
        })
    }
}
