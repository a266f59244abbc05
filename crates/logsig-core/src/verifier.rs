//! Block verifier: the state machine that drives a [`MerkleForest`]
//! against a log source and a signature stream, then checks the
//! resulting root against the block's signature.

use std::io::Cursor;

use crate::engine::SignatureEngine;
use crate::error::{ErrorContext, ErrorKind, LogSigError, Result};
use crate::forest::{CarryNode, MerkleForest};
use crate::imprint::Imprint;
use crate::objects::{self, BlockHeader, BlockSignature};
use crate::tlv;

/// Presence bits and decoded header/signature discovered by
/// [`Verifier::scan_block_params`], before the real verification pass begins.
#[derive(Debug, Clone)]
pub struct BlockParams {
    /// The block's header.
    pub header: BlockHeader,
    /// The block's terminating signature.
    pub signature: BlockSignature,
    /// Whether `0x0902` record-hash TLVs were present.
    pub has_rec_hashes: bool,
    /// Whether any `0x0903` tree-hash TLV was present.
    pub has_tree_hashes: bool,
}

/// What verifying one record produced: its leaf hash and any
/// intermediate ("carry") nodes the forest emitted as a result.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// The record's leaf hash.
    pub leaf: Imprint,
    /// Intermediate nodes produced by this append, lowest level first.
    pub carries: Vec<CarryNode>,
}

/// Drives verification of a single block's worth of records.
pub struct BlockSession<'e, E: SignatureEngine> {
    engine: &'e E,
    header: BlockHeader,
    has_rec_hashes: bool,
    has_tree_hashes: bool,
    forest: MerkleForest,
    n_consumed: u64,
    block_no: u64,
    record_no_in_file_base: u64,
    file_name: Option<String>,
}

impl<'e, E: SignatureEngine> BlockSession<'e, E> {
    fn ctx(&self) -> ErrorContext {
        let ctx = ErrorContext::at(
            self.block_no,
            self.n_consumed,
            self.record_no_in_file_base + self.n_consumed,
        );
        match &self.file_name {
            Some(name) => ctx.with_file_name(name.clone()),
            None => ctx,
        }
    }

    /// Number of records verified in this block so far.
    #[must_use]
    pub fn records_consumed(&self) -> u64 {
        self.n_consumed
    }

    /// Verify one record: compute its leaf hash, check it against the
    /// stream's `0x0902` (if present), append it to the forest, and
    /// check every resulting `0x0903` against the stream (if present).
    pub fn verify_record(
        &mut self,
        cursor: &mut Cursor<&[u8]>,
        rec_bytes: &[u8],
    ) -> Result<RecordOutcome> {
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
                log::debug!("leaf hash computation failed: {e}");
                LogSigError::with_context(ErrorKind::CreateHash, self.ctx())
            })?;

        if self.has_rec_hashes {
            let rec = tlv::read_record(cursor)?
                .ok_or_else(|| LogSigError::with_context(ErrorKind::MissRecHash, self.ctx()))?;
            if rec.tlv_type != objects::TYPE_REC_HASH {
                return Err(LogSigError::with_context(ErrorKind::MissRecHash, self.ctx()));
            }
            let file_imprint = Imprint::decode(&rec.payload, |a| self.engine.digest_length(a))?;
            if file_imprint.algo_id != self.header.hash_algo {
                return Err(LogSigError::with_context(ErrorKind::InvalidRecHashId, self.ctx()));
            }
            if file_imprint != leaf {
                log::debug!(
                    "record hash mismatch at block {} record {}",
                    self.block_no, self.n_consumed
                );
                return Err(LogSigError::with_context(
                    ErrorKind::InvalidRecHash,
                    self.ctx().with_hashes(leaf.clone(), file_imprint),
                ));
            }
        }

        let carries = self.forest.append(leaf.clone(), self.engine).map_err(|e| {
            log::debug!("tree node computation failed: {e}");
            LogSigError::with_context(ErrorKind::CreateHash, self.ctx())
        })?;

        if self.has_tree_hashes {
            for carry in &carries {
                let rec = tlv::read_record(cursor)?.ok_or_else(|| {
                    LogSigError::with_context(ErrorKind::MissTreeHash, self.ctx())
                })?;
                if rec.tlv_type != objects::TYPE_TREE_HASH {
                    return Err(LogSigError::with_context(ErrorKind::MissTreeHash, self.ctx()));
                }
                let file_imprint =
                    Imprint::decode(&rec.payload, |a| self.engine.digest_length(a))?;
                if file_imprint.algo_id != self.header.hash_algo {
                    return Err(LogSigError::with_context(
                        ErrorKind::InvalidTreeHashId,
                        self.ctx(),
                    ));
                }
                if file_imprint != carry.node {
                    return Err(LogSigError::with_context(
                        ErrorKind::InvalidTreeHash,
                        self.ctx().with_hashes(carry.node.clone(), file_imprint),
                    ));
                }
            }
        }

        self.n_consumed += 1;
        Ok(RecordOutcome { leaf, carries })
    }

    /// Consume the terminating `0x0904`, fold the forest into its root,
    /// and verify that root against the decoded signature.
    pub fn finalize(mut self, cursor: &mut Cursor<&[u8]>) -> Result<Imprint> {
        let rec = tlv::read_record(cursor)?
            .ok_or_else(|| LogSigError::with_context(ErrorKind::MissBlockSig, self.ctx()))?;
        if rec.tlv_type != objects::TYPE_BLOCK_SIG {
            return Err(LogSigError::with_context(ErrorKind::MissBlockSig, self.ctx()));
        }
        let block_sig = BlockSignature::decode(&rec.payload)?;
        if block_sig.record_count != self.n_consumed {
            return Err(LogSigError::with_context(
                ErrorKind::InvalidRecordCount,
                self.ctx(),
            ));
        }

        let digest_length = self
            .engine
            .digest_length(self.header.hash_algo)
            .ok_or_else(|| LogSigError::with_context(ErrorKind::InvalidRecHashId, self.ctx()))?;
        let (root, _fold_carries) = self.forest.finalize(self.engine).map_err(|e| {
            log::debug!("forest finalization failed: {e}");
            LogSigError::with_context(ErrorKind::CreateHash, self.ctx())
        })?;
        let root =
            root.unwrap_or_else(|| Imprint::new(self.header.hash_algo, vec![0u8; digest_length]));

        let sig = self
            .engine
            .parse_signature(&block_sig.signature_bytes)
            .map_err(|e| {
                log::debug!("signature parse failed: {e}");
                LogSigError::with_context(ErrorKind::InvalidSignature, self.ctx())
            })?;
        self.engine.verify_against_hash(&sig, &root).map_err(|e| {
            log::debug!("signature verification failed against computed root: {e}");
            LogSigError::with_context(ErrorKind::InvalidSignature, self.ctx())
        })?;

        Ok(root)
    }
}

/// Verifies a sequence of blocks against their log source, holding the
/// [`SignatureEngine`] and session-wide [`crate::config::Config`].
pub struct Verifier<E: SignatureEngine> {
    engine: E,
    #[allow(dead_code)]
    config: crate::config::Config,
}

impl<E: SignatureEngine> Verifier<E> {
    /// Construct a verifier for one session.
    pub fn new(engine: E, config: crate::config::Config) -> Self {
        Self { engine, config }
    }

    /// Read and check the file's 8-byte magic. On mismatch, the cursor
    /// is restored to its entry position.
    pub fn read_file_header(&self, cursor: &mut Cursor<&[u8]>, expected_magic: &str) -> Result<()> {
        let start = cursor.position();
        let mut magic = [0u8; 8];
        std::io::Read::read_exact(cursor, &mut magic)?;
        if magic != expected_magic.as_bytes() {
            cursor.set_position(start);
            return Err(LogSigError::new(ErrorKind::InvalidHeader));
        }
        Ok(())
    }

    /// Pre-scan a block: decode its header and signature and discover
    /// whether per-record and tree hashes are present, without
    /// disturbing the cursor unless `rewind` is `false`.
    pub fn scan_block_params(&self, cursor: &mut Cursor<&[u8]>, rewind: bool) -> Result<BlockParams> {
        let start = cursor.position();

        let header_rec = tlv::read_record(cursor)?.ok_or(LogSigError::new(ErrorKind::Eof))?;
        if header_rec.tlv_type != objects::TYPE_BLOCK_HEADER {
            return Err(LogSigError::new(ErrorKind::InvalidType));
        }
        let header = BlockHeader::decode(&header_rec.payload, |a| self.engine.digest_length(a))?;

        let mut rec_count = 0u64;
        let mut saw_tree = false;
        let signature = loop {
            let rec = tlv::read_record(cursor)?.ok_or(LogSigError::new(ErrorKind::MissBlockSig))?;
            match rec.tlv_type {
                objects::TYPE_REC_HASH => rec_count += 1,
                objects::TYPE_TREE_HASH => saw_tree = true,
                objects::TYPE_BLOCK_SIG => break BlockSignature::decode(&rec.payload)?,
                other => log::warn!("ignoring unexpected top-level TLV 0x{other:04x} during block scan"),
            }
        };

        let has_rec_hashes = rec_count > 0;
        if has_rec_hashes && rec_count != signature.record_count {
            return Err(LogSigError::new(ErrorKind::InvalidRecordCount));
        }

        if rewind {
            cursor.set_position(start);
        }

        Ok(BlockParams {
            header,
            signature,
            has_rec_hashes,
            has_tree_hashes: saw_tree,
        })
    }

    /// Begin a verification pass over one block: pre-scans with rewind,
    /// then consumes the block header for real and returns a
    /// [`BlockSession`] ready to be driven with `verify_record`.
    pub fn begin_block(
        &self,
        cursor: &mut Cursor<&[u8]>,
        block_no: u64,
        record_no_in_file_base: u64,
        file_name: Option<String>,
    ) -> Result<(BlockParams, BlockSession<'_, E>)> {
        let params = self.scan_block_params(cursor, true)?;

        let header_rec = tlv::read_record(cursor)?.ok_or(LogSigError::new(ErrorKind::Eof))?;
        debug_assert_eq!(header_rec.tlv_type, objects::TYPE_BLOCK_HEADER);

        let session = BlockSession {
            engine: &self.engine,
            header: params.header.clone(),
            has_rec_hashes: params.has_rec_hashes,
            has_tree_hashes: params.has_tree_hashes,
            forest: MerkleForest::new(),
            n_consumed: 0,
            block_no,
            record_no_in_file_base,
            file_name,
        };

        Ok((params, session))
    }

    /// Access the underlying signature engine (e.g. for the extractor or extend module).
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Signature as _;
    use crate::testing::{self, MockEngine};

    fn engine_and_config() -> Verifier<MockEngine> {
        Verifier::new(MockEngine::new(), crate::config::Config::default())
    }

    #[test]
    fn verifies_single_record_block() {
        let verifier = engine_and_config();
        let mock = MockEngine::new();
        let zero_root = Imprint::new(testing::MOCK_ALGO_SHA256, vec![0u8; 32]);
        let built = testing::build_block(&mock, &[b"hello"], &zero_root, true, false);

        let mut whole = built.header.clone();
        whole.extend_from_slice(&built.body);
        let mut cursor = Cursor::new(whole.as_slice());

        let (_params, mut session) = verifier.begin_block(&mut cursor, 0, 0, None).unwrap();
        session.verify_record(&mut cursor, b"hello").unwrap();
        let root = session.finalize(&mut cursor).unwrap();
        assert_eq!(root, built.root);
    }

    #[test]
    fn verifies_two_record_block_with_tree_hash() {
        let verifier = engine_and_config();
        let mock = MockEngine::new();
        let zero_root = Imprint::new(testing::MOCK_ALGO_SHA256, vec![0u8; 32]);
        let built = testing::build_block(&mock, &[b"a", b"b"], &zero_root, true, true);

        let mut whole = built.header.clone();
        whole.extend_from_slice(&built.body);
        let mut cursor = Cursor::new(whole.as_slice());

        let (_params, mut session) = verifier.begin_block(&mut cursor, 0, 0, None).unwrap();
        session.verify_record(&mut cursor, b"a").unwrap();
        session.verify_record(&mut cursor, b"b").unwrap();
        let root = session.finalize(&mut cursor).unwrap();
        assert_eq!(root, built.root);
    }

    #[test]
    fn detects_tampered_record() {
        let verifier = engine_and_config();
        let mock = MockEngine::new();
        let zero_root = Imprint::new(testing::MOCK_ALGO_SHA256, vec![0u8; 32]);
        let built = testing::build_block(&mock, &[b"a", b"b"], &zero_root, true, true);

        let mut whole = built.header.clone();
        whole.extend_from_slice(&built.body);
        let mut cursor = Cursor::new(whole.as_slice());

        let (_params, mut session) = verifier.begin_block(&mut cursor, 0, 0, None).unwrap();
        session.verify_record(&mut cursor, b"a").unwrap();
        let err = session.verify_record(&mut cursor, b"B").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRecHash);
        assert!(err.context.is_some());
    }

    #[test]
    fn detects_record_count_mismatch() {
        let verifier = engine_and_config();
        let mock = MockEngine::new();
        let iv = vec![0x42u8; 32];
        let zero_root = Imprint::new(testing::MOCK_ALGO_SHA256, vec![0u8; 32]);

        let header = BlockHeader {
            hash_algo: testing::MOCK_ALGO_SHA256,
            iv: iv.clone(),
            last_hash: zero_root.clone(),
        };
        let leaf = mock
            .hash_leaf(testing::MOCK_ALGO_SHA256, &iv, &zero_root, 0, b"a")
            .unwrap();

        let mut whole = Vec::new();
        tlv::write_record(&mut whole, &header.encode()).unwrap();
        tlv::write_record(
            &mut whole,
            &crate::tlv::Record::new(objects::TYPE_REC_HASH, leaf.to_bytes()),
        )
        .unwrap();

        // Claim 99 records were signed, though only one was ever written.
        let sig = testing::MockSignature::for_root(leaf);
        let block_sig = BlockSignature {
            record_count: 99,
            signature_bytes: sig.serialize(),
        };
        tlv::write_record(&mut whole, &block_sig.encode()).unwrap();

        let mut cursor = Cursor::new(whole.as_slice());
        let (_params, mut session) = verifier.begin_block(&mut cursor, 0, 0, None).unwrap();
        session.verify_record(&mut cursor, b"a").unwrap();
        let err = session.finalize(&mut cursor).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRecordCount);
    }

    #[test]
    fn file_header_mismatch_restores_position() {
        let verifier = engine_and_config();
        let mut data = b"LOGSIG11restofstream".to_vec();
        data.truncate(8);
        let mut cursor = Cursor::new(data.as_slice());
        let err = verifier.read_file_header(&mut cursor, "LOGSIG10").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidHeader);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn file_header_match_advances_position() {
        let verifier = engine_and_config();
        let data = b"LOGSIG11".to_vec();
        let mut cursor = Cursor::new(data.as_slice());
        verifier.read_file_header(&mut cursor, "LOGSIG11").unwrap();
        assert_eq!(cursor.position(), 8);
    }
}
