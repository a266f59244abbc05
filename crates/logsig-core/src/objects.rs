//! Typed domain objects decoded from and encoded to TLV records.

use crate::error::{ErrorKind, LogSigError, Result};
use crate::imprint::Imprint;
use crate::tlv::{self, Record, TlvCursor};

/// Block header, opening a new block.
pub const TYPE_BLOCK_HEADER: u16 = 0x0901;
/// Per-record (leaf) hash imprint.
pub const TYPE_REC_HASH: u16 = 0x0902;
/// Intermediate (tree) hash imprint.
pub const TYPE_TREE_HASH: u16 = 0x0903;
/// Block signature, closing a block.
pub const TYPE_BLOCK_SIG: u16 = 0x0904;
/// Stand-alone excerpt signature (outside any block).
pub const TYPE_EXCERPT_SIG: u16 = 0x0905;
/// Extended signature nested inside a block-signature TLV.
pub const TYPE_INNER_SIG: u16 = 0x0906;
/// Hash-chain excerpt record.
pub const TYPE_HASH_CHAIN: u16 = 0x0907;

const CHILD_HASH_ALGO: u16 = 0x01;
const CHILD_IV: u16 = 0x02;
const CHILD_LAST_HASH: u16 = 0x03;
const CHILD_RECORD_COUNT: u16 = 0x01;
const CHILD_RECORD_HASH: u16 = 0x01;
const CHILD_LEFT: u16 = 0x02;
const CHILD_RIGHT: u16 = 0x03;
const CHILD_LEVEL_CORRECTION: u16 = 0x01;
const CHILD_SIBLING: u16 = 0x02;

/// `0x0901` — opens a block: the hash algorithm in effect, the IV that
/// seeds leaf hashing, and the chain-linking hash of the previous block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Hash algorithm identifier used for every hash inside this block.
    pub hash_algo: u8,
    /// Per-block initialization vector, `digest_length(hash_algo)` bytes.
    pub iv: Vec<u8>,
    /// Final root imprint of the previous block (all-zero data for chain start).
    pub last_hash: Imprint,
}

impl BlockHeader {
    /// Decode from an already-unwrapped `0x0901` record payload.
    pub fn decode(payload: &[u8], digest_length: impl Fn(u8) -> Option<usize>) -> Result<Self> {
        let mut cursor = TlvCursor::new(payload);
        let algo_rec = cursor.expect(CHILD_HASH_ALGO)?;
        let hash_algo = *algo_rec
            .payload
            .first()
            .ok_or(LogSigError::new(ErrorKind::Fmt))?;

        let iv_rec = cursor.expect(CHILD_IV)?;
        let expected_len =
            digest_length(hash_algo).ok_or(LogSigError::new(ErrorKind::InvalidRecHashId))?;
        if iv_rec.payload.len() != expected_len {
            return Err(LogSigError::new(ErrorKind::Fmt));
        }

        let last_hash_rec = cursor.expect(CHILD_LAST_HASH)?;
        let last_hash = Imprint::decode(&last_hash_rec.payload, &digest_length)?;
        cursor.finish()?;

        Ok(Self {
            hash_algo,
            iv: iv_rec.payload,
            last_hash,
        })
    }

    /// Encode into a full `0x0901` record.
    #[must_use]
    pub fn encode(&self) -> Record {
        let mut payload = Vec::new();
        tlv::write_record(&mut payload, &Record::new(CHILD_HASH_ALGO, vec![self.hash_algo]))
            .expect("writing to a Vec cannot fail");
        tlv::write_record(&mut payload, &Record::new(CHILD_IV, self.iv.clone()))
            .expect("writing to a Vec cannot fail");
        tlv::write_record(
            &mut payload,
            &Record::new(CHILD_LAST_HASH, self.last_hash.to_bytes()),
        )
        .expect("writing to a Vec cannot fail");
        Record::new(TYPE_BLOCK_HEADER, payload)
    }

    /// Whether `last_hash` marks the start of a fresh hash chain.
    #[must_use]
    pub fn is_chain_start(&self) -> bool {
        self.last_hash.data.iter().all(|&b| b == 0)
    }
}

/// `0x0904` — closes a block: how many records it covers and the signature over its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSignature {
    /// Number of leaves (log records) the block's Merkle tree covers.
    pub record_count: u64,
    /// The signature bytes themselves (DER-encoded timestamp token).
    pub signature_bytes: Vec<u8>,
}

impl BlockSignature {
    /// Decode from an already-unwrapped `0x0904` record payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cursor = TlvCursor::new(payload);
        let count_rec = cursor.expect(CHILD_RECORD_COUNT)?;
        let record_count = tlv::decode_uint(&count_rec.payload)?;
        let sig_rec = cursor.expect(TYPE_INNER_SIG)?;
        cursor.finish()?;
        Ok(Self {
            record_count,
            signature_bytes: sig_rec.payload,
        })
    }

    /// Encode into a full `0x0904` record.
    #[must_use]
    pub fn encode(&self) -> Record {
        let mut payload = Vec::new();
        tlv::write_record(
            &mut payload,
            &Record::new(CHILD_RECORD_COUNT, tlv::encode_uint(self.record_count)),
        )
        .expect("writing to a Vec cannot fail");
        tlv::write_record(
            &mut payload,
            &Record::new(TYPE_INNER_SIG, self.signature_bytes.clone()),
        )
        .expect("writing to a Vec cannot fail");
        Record::new(TYPE_BLOCK_SIG, payload)
    }
}

/// One step of a hash-chain: a sibling imprint and how many tree levels it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Number of extra tree levels this sibling spans beyond one.
    pub level_correction: u8,
    /// The sibling hash itself.
    pub sibling: Imprint,
}

impl Step {
    /// A no-op placeholder step: an all-zero sibling at a single leaf's
    /// path on the side where no combination ever occurred (e.g. the
    /// right step of the sole record in a one-record block). The wire
    /// format always carries both steps, so this fills the unused one
    /// with something an excerpt verifier can recognize and skip.
    #[must_use]
    pub fn none(algo_id: u8, digest_len: usize) -> Self {
        Self {
            level_correction: 0,
            sibling: Imprint::new(algo_id, vec![0u8; digest_len]),
        }
    }

    /// Whether this step is the [`Step::none`] no-op placeholder.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.sibling.data.iter().all(|&b| b == 0)
    }

    fn decode(payload: &[u8], digest_length: impl Fn(u8) -> Option<usize>) -> Result<Self> {
        let mut cursor = TlvCursor::new(payload);
        let lc_rec = cursor.expect(CHILD_LEVEL_CORRECTION)?;
        let level_correction = *lc_rec
            .payload
            .first()
            .ok_or(LogSigError::new(ErrorKind::Fmt))?;
        let sibling_rec = cursor.expect(CHILD_SIBLING)?;
        let sibling = Imprint::decode(&sibling_rec.payload, &digest_length)?;
        cursor.finish()?;
        Ok(Self {
            level_correction,
            sibling,
        })
    }

    fn encode(&self, child_type: u16) -> Record {
        let mut payload = Vec::new();
        tlv::write_record(
            &mut payload,
            &Record::new(CHILD_LEVEL_CORRECTION, vec![self.level_correction]),
        )
        .expect("writing to a Vec cannot fail");
        tlv::write_record(
            &mut payload,
            &Record::new(CHILD_SIBLING, self.sibling.to_bytes()),
        )
        .expect("writing to a Vec cannot fail");
        Record::new(child_type, payload)
    }
}

/// `0x0907` — a self-contained Merkle path proving one record belongs to a signed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashChain {
    /// Hash of the record this chain proves membership for.
    pub record_hash: Imprint,
    /// Left sibling step (closest to the leaf).
    pub left: Step,
    /// Right sibling step (closest to the root).
    pub right: Step,
}

impl HashChain {
    /// Decode from an already-unwrapped `0x0907` record payload.
    pub fn decode(payload: &[u8], digest_length: impl Fn(u8) -> Option<usize> + Copy) -> Result<Self> {
        let mut cursor = TlvCursor::new(payload);
        let record_hash_rec = cursor.expect(CHILD_RECORD_HASH)?;
        let record_hash = Imprint::decode(&record_hash_rec.payload, digest_length)?;

        let left_rec = cursor.expect(CHILD_LEFT)?;
        let left = Step::decode(&left_rec.payload, digest_length)?;

        let right_rec = cursor.expect(CHILD_RIGHT)?;
        let right = Step::decode(&right_rec.payload, digest_length)?;
        cursor.finish()?;

        if left.sibling.algo_id != record_hash.algo_id || right.sibling.algo_id != record_hash.algo_id {
            return Err(LogSigError::new(ErrorKind::InvalidRecHashId));
        }

        Ok(Self {
            record_hash,
            left,
            right,
        })
    }

    /// Encode into a full `0x0907` record.
    #[must_use]
    pub fn encode(&self) -> Record {
        let mut payload = Vec::new();
        tlv::write_record(
            &mut payload,
            &Record::new(CHILD_RECORD_HASH, self.record_hash.to_bytes()),
        )
        .expect("writing to a Vec cannot fail");
        tlv::write_record(&mut payload, &self.left.encode(CHILD_LEFT))
            .expect("writing to a Vec cannot fail");
        tlv::write_record(&mut payload, &self.right.encode(CHILD_RIGHT))
            .expect("writing to a Vec cannot fail");
        Record::new(TYPE_HASH_CHAIN, payload)
    }
}

/// `0x0905` — a stand-alone excerpt signature: the signature bytes
/// alone, no hash chain attached. The `0x0907` hash-chain TLVs proved
/// under it are siblings at the top level of the excerpt file, not
/// children of this record — see [`crate::excerpt::scan_excerpt_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptSignature {
    /// The signature bytes themselves (DER-encoded timestamp token).
    pub signature_bytes: Vec<u8>,
}

impl ExcerptSignature {
    /// Decode from an already-unwrapped `0x0905` record payload: the
    /// whole payload is the signature, with no TLV structure of its own.
    #[must_use]
    pub fn decode(payload: &[u8]) -> Self {
        Self {
            signature_bytes: payload.to_vec(),
        }
    }

    /// Encode into a full `0x0905` record.
    #[must_use]
    pub fn encode(&self) -> Record {
        Record::new(TYPE_EXCERPT_SIG, self.signature_bytes.clone())
    }
}
