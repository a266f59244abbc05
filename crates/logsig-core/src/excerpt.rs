//! Verifying a single excerpted record against a hash chain and the
//! signature it ultimately rolls up to, without needing the rest of
//! the block.

use std::io::Cursor;

use crate::engine::SignatureEngine;
use crate::error::{ErrorKind, LogSigError, Result};
use crate::imprint::Imprint;
use crate::objects::{self, ExcerptSignature, HashChain};
use crate::tlv;

/// One `(0x0905, 0x0907+)` group from an excerpt file: a stand-alone
/// signature and every hash chain proved under it.
#[derive(Debug, Clone)]
pub struct ExcerptGroup {
    /// The signature bytes covering every chain's final root.
    pub signature_bytes: Vec<u8>,
    /// Hash chains paired with this signature, in stream order.
    pub chains: Vec<HashChain>,
}

/// Read the next `(0x0905, 0x0907+)` group from an excerpt stream.
///
/// Returns `Ok(None)` at a clean end of stream. A `0x0907` run is
/// collected until the next `0x0905` (left unconsumed, for the next
/// call) or end of stream, mirroring
/// [`crate::verifier::Verifier::scan_block_params`]'s pre-scan shape.
pub fn scan_excerpt_group<E: SignatureEngine>(
    cursor: &mut Cursor<&[u8]>,
    engine: &E,
) -> Result<Option<ExcerptGroup>> {
    let Some(sig_rec) = tlv::read_record(cursor)? else {
        return Ok(None);
    };
    if sig_rec.tlv_type != objects::TYPE_EXCERPT_SIG {
        return Err(LogSigError::new(ErrorKind::InvalidType));
    }
    let signature = ExcerptSignature::decode(&sig_rec.payload);

    let mut chains = Vec::new();
    loop {
        let before = cursor.position();
        match tlv::read_record(cursor)? {
            None => break,
            Some(rec) if rec.tlv_type == objects::TYPE_HASH_CHAIN => {
                let chain = HashChain::decode(&rec.payload, |a| engine.digest_length(a))?;
                chains.push(chain);
            }
            Some(_) => {
                cursor.set_position(before);
                break;
            }
        }
    }

    Ok(Some(ExcerptGroup {
        signature_bytes: signature.signature_bytes,
        chains,
    }))
}

/// The leaf-hashing parameters a [`HashChain`] was extracted under:
/// everything [`SignatureEngine::hash_leaf`] needs besides the record
/// bytes themselves.
#[derive(Debug, Clone)]
pub struct ExcerptContext {
    /// Hash algorithm the chain's imprints use.
    pub hash_algo: u8,
    /// The block's initialization vector.
    pub iv: Vec<u8>,
    /// Chain-linking hash of the previous block.
    pub prev_root: Imprint,
    /// The record's 0-based index within its block.
    pub record_index: u64,
}

/// Recompute a record's leaf hash and walk it up `chain` to a root,
/// then check that root against `sig` via `engine`.
///
/// Implements the fixed two-hop excerpt algorithm: an optional
/// left-type combination carries the leaf hash to `chain.record_hash`,
/// then an optional right-type combination carries that to the value
/// verified against the signature. Either hop is skipped when its
/// [`crate::objects::Step`] is [`crate::objects::Step::none`].
pub fn verify_excerpt<E: SignatureEngine>(
    engine: &E,
    ctx: &ExcerptContext,
    rec_bytes: &[u8],
    chain: &HashChain,
    sig: &E::Sig,
) -> Result<()> {
    let line_hash = engine
        .hash_leaf(ctx.hash_algo, &ctx.iv, &ctx.prev_root, ctx.record_index, rec_bytes)
        .map_err(|e| {
            log::debug!("leaf hash computation failed during excerpt verification: {e}");
            LogSigError::new(ErrorKind::CreateHash)
        })?;

    let root = if chain.left.is_none() {
        line_hash
    } else {
        let level = chain
            .left
            .level_correction
            .checked_add(1)
            .ok_or_else(|| LogSigError::new(ErrorKind::Fmt))?;
        engine
            .hash_node(&chain.left.sibling, &line_hash, level)
            .map_err(|e| {
                log::debug!("hash-chain left combination failed: {e}");
                LogSigError::new(ErrorKind::CreateHash)
            })?
    };

    if root != chain.record_hash {
        log::debug!("excerpt record hash does not match the hash chain's claimed anchor");
        return Err(LogSigError::new(ErrorKind::InvalidRecHash));
    }

    let root = if chain.right.is_none() {
        root
    } else {
        engine
            .hash_node(&chain.right.sibling, &root, chain.right.level_correction)
            .map_err(|e| {
                log::debug!("hash-chain right combination failed: {e}");
                LogSigError::new(ErrorKind::CreateHash)
            })?
    };

    engine.verify_against_hash(sig, &root).map_err(|e| {
        log::debug!("excerpt signature verification failed: {e}");
        LogSigError::new(ErrorKind::InvalidSignature)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Signature as _;
    use crate::extractor::Extractor;
    use crate::objects::BlockHeader;
    use crate::testing::{self, MockEngine};

    fn header_for(prev_root: &Imprint) -> BlockHeader {
        BlockHeader {
            hash_algo: testing::MOCK_ALGO_SHA256,
            iv: vec![0x42u8; 32],
            last_hash: prev_root.clone(),
        }
    }

    #[test]
    fn extracted_chain_verifies_for_single_record_block() {
        let mock = MockEngine::new();
        let zero_root = Imprint::new(testing::MOCK_ALGO_SHA256, vec![0u8; 32]);
        let header = header_for(&zero_root);

        let mut extractor = Extractor::new(&mock, header.clone(), 0);
        extractor.observe_record(b"only").unwrap();
        let chain = extractor.finish().unwrap();

        let built = testing::build_block(&mock, &[b"only"], &zero_root, false, false);
        let signature = testing::MockSignature::for_root(built.root.clone());

        let ctx = ExcerptContext {
            hash_algo: header.hash_algo,
            iv: header.iv.clone(),
            prev_root: header.last_hash.clone(),
            record_index: 0,
        };
        verify_excerpt(&mock, &ctx, b"only", &chain, &signature).unwrap();
    }

    #[test]
    fn extracted_chain_verifies_for_middle_record_of_four() {
        let mock = MockEngine::new();
        let zero_root = Imprint::new(testing::MOCK_ALGO_SHA256, vec![0u8; 32]);
        let header = header_for(&zero_root);
        let records: [&[u8]; 4] = [b"a", b"b", b"c", b"d"];

        let mut extractor = Extractor::new(&mock, header.clone(), 2);
        for rec in &records {
            extractor.observe_record(rec).unwrap();
        }
        let chain = extractor.finish().unwrap();

        let built = testing::build_block(&mock, &records, &zero_root, false, false);
        let signature = testing::MockSignature::for_root(built.root.clone());

        let ctx = ExcerptContext {
            hash_algo: header.hash_algo,
            iv: header.iv.clone(),
            prev_root: header.last_hash.clone(),
            record_index: 2,
        };
        verify_excerpt(&mock, &ctx, b"c", &chain, &signature).unwrap();
    }

    #[test]
    fn tampered_record_fails_excerpt_verification() {
        let mock = MockEngine::new();
        let zero_root = Imprint::new(testing::MOCK_ALGO_SHA256, vec![0u8; 32]);
        let header = header_for(&zero_root);
        let records: [&[u8]; 4] = [b"a", b"b", b"c", b"d"];

        let mut extractor = Extractor::new(&mock, header.clone(), 2);
        for rec in &records {
            extractor.observe_record(rec).unwrap();
        }
        let chain = extractor.finish().unwrap();

        let built = testing::build_block(&mock, &records, &zero_root, false, false);
        let signature = testing::MockSignature::for_root(built.root.clone());

        let ctx = ExcerptContext {
            hash_algo: header.hash_algo,
            iv: header.iv.clone(),
            prev_root: header.last_hash.clone(),
            record_index: 2,
        };
        let err = verify_excerpt(&mock, &ctx, b"C", &chain, &signature).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRecHash);
    }

    #[test]
    fn wrong_signature_fails_excerpt_verification() {
        let mock = MockEngine::new();
        let zero_root = Imprint::new(testing::MOCK_ALGO_SHA256, vec![0u8; 32]);
        let header = header_for(&zero_root);
        let records: [&[u8]; 4] = [b"a", b"b", b"c", b"d"];

        let mut extractor = Extractor::new(&mock, header.clone(), 2);
        for rec in &records {
            extractor.observe_record(rec).unwrap();
        }
        let chain = extractor.finish().unwrap();

        let bogus_root = Imprint::new(testing::MOCK_ALGO_SHA256, vec![0x99; 32]);
        let signature = testing::MockSignature::for_root(bogus_root);

        let ctx = ExcerptContext {
            hash_algo: header.hash_algo,
            iv: header.iv.clone(),
            prev_root: header.last_hash.clone(),
            record_index: 2,
        };
        let err = verify_excerpt(&mock, &ctx, b"c", &chain, &signature).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSignature);
    }

    #[test]
    fn scan_groups_pairs_signature_with_its_chains() {
        let mock = MockEngine::new();
        let zero_root = Imprint::new(testing::MOCK_ALGO_SHA256, vec![0u8; 32]);
        let header = header_for(&zero_root);
        let records: [&[u8]; 4] = [b"a", b"b", b"c", b"d"];

        let mut stream = Vec::new();
        let sig_a = testing::MockSignature::for_root(Imprint::new(testing::MOCK_ALGO_SHA256, vec![0xAA; 32]));
        crate::tlv::write_record(
            &mut stream,
            &crate::objects::ExcerptSignature {
                signature_bytes: sig_a.serialize(),
            }
            .encode(),
        )
        .unwrap();

        let mut extractor0 = Extractor::new(&mock, header.clone(), 0);
        for rec in &records {
            extractor0.observe_record(rec).unwrap();
        }
        let chain0 = extractor0.finish().unwrap();
        crate::tlv::write_record(&mut stream, &chain0.encode()).unwrap();

        let mut extractor1 = Extractor::new(&mock, header.clone(), 1);
        for rec in &records {
            extractor1.observe_record(rec).unwrap();
        }
        let chain1 = extractor1.finish().unwrap();
        crate::tlv::write_record(&mut stream, &chain1.encode()).unwrap();

        let sig_b = testing::MockSignature::for_root(Imprint::new(testing::MOCK_ALGO_SHA256, vec![0xBB; 32]));
        crate::tlv::write_record(
            &mut stream,
            &crate::objects::ExcerptSignature {
                signature_bytes: sig_b.serialize(),
            }
            .encode(),
        )
        .unwrap();

        let mut cursor = std::io::Cursor::new(stream.as_slice());
        let group_a = scan_excerpt_group(&mut cursor, &mock).unwrap().unwrap();
        assert_eq!(group_a.signature_bytes, sig_a.serialize());
        assert_eq!(group_a.chains, vec![chain0, chain1]);

        let group_b = scan_excerpt_group(&mut cursor, &mock).unwrap().unwrap();
        assert_eq!(group_b.signature_bytes, sig_b.serialize());
        assert!(group_b.chains.is_empty());

        assert!(scan_excerpt_group(&mut cursor, &mock).unwrap().is_none());
    }
}
