//! Synthetic test data and a `sha2`-based [`SignatureEngine`] stand-in.
//!
//! Always compiled (not `#[cfg(test)]`-gated), so both this crate's own
//! unit tests and downstream integration tests can build conforming
//! signature streams without a real timestamping dependency.

use sha2::{Digest, Sha256};

use crate::engine::{Signature, SignatureEngine};
use crate::forest::MerkleForest;
use crate::imprint::Imprint;
use crate::objects::{BlockHeader, BlockSignature};
use crate::tlv;

/// Algorithm id `MockEngine` understands: SHA-256.
pub const MOCK_ALGO_SHA256: u8 = 0x01;

/// A signature produced by [`MockEngine`]: a committed root imprint
/// plus an extension counter (bumped by [`SignatureEngine::extend_signature`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSignature {
    root: Imprint,
    extensions: u8,
}

impl MockSignature {
    /// Build a fresh, un-extended signature over `root`. Exposed so
    /// tests (in this crate or downstream) can hand-craft signature
    /// bytes without going through [`build_block`].
    #[must_use]
    pub fn for_root(root: Imprint) -> Self {
        Self {
            root,
            extensions: 0,
        }
    }
}

impl Signature for MockSignature {
    fn serialize(&self) -> Vec<u8> {
        let mut out = self.root.to_bytes();
        out.push(self.extensions);
        out
    }
}

/// Error type for [`MockEngine`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mock engine error: {0}")]
pub struct MockEngineError(pub String);

/// A `SignatureEngine` implementation backed by SHA-256, used only by
/// this crate's own tests and by downstream tests via this module.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockEngine;

impl MockEngine {
    /// Construct a new mock engine. Stateless — there's nothing to configure.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn leaf_mask(iv: &[u8], prev_root: &Imprint, n_records: u64) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(iv);
        hasher.update(&prev_root.data);
        hasher.update(n_records.to_be_bytes());
        hasher.finalize().into()
    }
}

impl SignatureEngine for MockEngine {
    type Sig = MockSignature;
    type Err = MockEngineError;

    fn digest_length(&self, algo_id: u8) -> Option<usize> {
        (algo_id == MOCK_ALGO_SHA256).then_some(32)
    }

    fn parse_signature(&self, bytes: &[u8]) -> Result<Self::Sig, Self::Err> {
        if bytes.len() != 34 {
            return Err(MockEngineError(format!(
                "expected 34-byte mock signature, got {}",
                bytes.len()
            )));
        }
        let root = Imprint::decode(&bytes[..33], |a| self.digest_length(a))
            .map_err(|e| MockEngineError(format!("{e}")))?;
        Ok(MockSignature {
            root,
            extensions: bytes[33],
        })
    }

    fn verify_signature(&self, sig: &Self::Sig) -> Result<(), Self::Err> {
        if sig.root.data.len() == 32 {
            Ok(())
        } else {
            Err(MockEngineError("malformed root in mock signature".into()))
        }
    }

    fn verify_against_hash(&self, sig: &Self::Sig, hash: &Imprint) -> Result<(), Self::Err> {
        if &sig.root == hash {
            Ok(())
        } else {
            Err(MockEngineError("root does not match signed hash".into()))
        }
    }

    fn extend_signature(&self, sig: &Self::Sig) -> Result<Self::Sig, Self::Err> {
        Ok(MockSignature {
            root: sig.root.clone(),
            extensions: sig.extensions.saturating_add(1),
        })
    }

    fn hash_leaf(
        &self,
        algo_id: u8,
        iv: &[u8],
        prev_root: &Imprint,
        n_records: u64,
        rec_bytes: &[u8],
    ) -> Result<Imprint, Self::Err> {
        if algo_id != MOCK_ALGO_SHA256 {
            return Err(MockEngineError(format!("unsupported algo id {algo_id:#x}")));
        }
        let mask = Self::leaf_mask(iv, prev_root, n_records);
        let mut hasher = Sha256::new();
        hasher.update(b"leaf");
        hasher.update(mask);
        hasher.update(rec_bytes);
        Ok(Imprint::new(algo_id, hasher.finalize().to_vec()))
    }

    fn hash_node(&self, left: &Imprint, right: &Imprint, level: u8) -> Result<Imprint, Self::Err> {
        if left.algo_id != right.algo_id {
            return Err(MockEngineError("sibling algorithm mismatch".into()));
        }
        // Order-independent: a hash-chain excerpt only ever records one of
        // the two operands (the sibling) and reapplies this function with
        // the sibling named first regardless of which side it sat on
        // during construction, so this must not depend on argument order.
        let (lo, hi) = if left.data <= right.data {
            (&left.data, &right.data)
        } else {
            (&right.data, &left.data)
        };
        let mut hasher = Sha256::new();
        hasher.update(b"node");
        hasher.update([level]);
        hasher.update(lo);
        hasher.update(hi);
        Ok(Imprint::new(left.algo_id, hasher.finalize().to_vec()))
    }
}

/// A block built by [`build_block`], ready to be written to a stream.
pub struct BuiltBlock {
    /// The block header record bytes.
    pub header: Vec<u8>,
    /// Per-record hash, tree-hash, and the terminating block-signature record bytes, in wire order.
    pub body: Vec<u8>,
    /// The finalized root, for tests that want to assert against it directly.
    pub root: Imprint,
}

/// Build one block's wire bytes over `records`, using `prev_root` as the chain-link hash.
///
/// `emit_record_hashes`/`emit_tree_hashes` control which imprint TLVs
/// are included, mirroring the presence bits a real writer may omit.
pub fn build_block(
    engine: &MockEngine,
    records: &[&[u8]],
    prev_root: &Imprint,
    emit_record_hashes: bool,
    emit_tree_hashes: bool,
) -> BuiltBlock {
    let iv = vec![0x42u8; 32];
    let header = BlockHeader {
        hash_algo: MOCK_ALGO_SHA256,
        iv: iv.clone(),
        last_hash: prev_root.clone(),
    };
    let header_bytes = {
        let mut buf = Vec::new();
        tlv::write_record(&mut buf, &header.encode()).unwrap();
        buf
    };

    let mut forest = MerkleForest::new();
    let mut body = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let leaf = engine
            .hash_leaf(MOCK_ALGO_SHA256, &iv, prev_root, i as u64, rec)
            .expect("mock engine never fails on well-formed input");
        if emit_record_hashes {
            tlv::write_record(
                &mut body,
                &crate::tlv::Record::new(crate::objects::TYPE_REC_HASH, leaf.to_bytes()),
            )
            .unwrap();
        }
        let carries = forest
            .append(leaf, engine)
            .expect("mock engine never fails on well-formed input");
        if emit_tree_hashes {
            for carry in carries {
                tlv::write_record(
                    &mut body,
                    &crate::tlv::Record::new(crate::objects::TYPE_TREE_HASH, carry.node.to_bytes()),
                )
                .unwrap();
            }
        }
    }

    let (root, _fold_carries) = forest
        .finalize(engine)
        .expect("mock engine never fails on well-formed input");
    let root = root.unwrap_or_else(|| Imprint::new(MOCK_ALGO_SHA256, vec![0u8; 32]));

    let signature = MockSignature::for_root(root.clone());
    let block_sig = BlockSignature {
        record_count: records.len() as u64,
        signature_bytes: signature.serialize(),
    };
    tlv::write_record(&mut body, &block_sig.encode()).unwrap();

    BuiltBlock {
        header: header_bytes,
        body,
        root,
    }
}

/// Build a complete single-block signature file, magic included.
#[must_use]
pub fn build_single_block_file(engine: &MockEngine, records: &[&[u8]]) -> Vec<u8> {
    let zero_root = Imprint::new(MOCK_ALGO_SHA256, vec![0u8; 32]);
    let block = build_block(engine, records, &zero_root, true, true);
    let mut out = Vec::new();
    out.extend_from_slice(FILE_MAGIC_V11.as_bytes());
    out.extend_from_slice(&block.header);
    out.extend_from_slice(&block.body);
    out
}

/// The current block-format file magic.
pub const FILE_MAGIC_V11: &str = "LOGSIG11";
