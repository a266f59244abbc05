//! Signature extension: re-timestamping a block's signature against a
//! later publication and rewriting its `0x0904` record in place.

use crate::engine::{Signature, SignatureEngine};
use crate::error::{ErrorKind, LogSigError, Result};
use crate::objects::{self, BlockSignature};
use crate::tlv::Record;

/// Extend the signature carried by a decoded `0x0904` record, returning
/// a freshly encoded `0x0904` record with the same `record_count` but a
/// new, extended signature.
pub fn extend_block_signature<E: SignatureEngine>(engine: &E, record: &Record) -> Result<Record> {
    if record.tlv_type != objects::TYPE_BLOCK_SIG {
        return Err(LogSigError::new(ErrorKind::InvalidType));
    }
    let block_sig = BlockSignature::decode(&record.payload)?;

    let parsed = engine.parse_signature(&block_sig.signature_bytes).map_err(|e| {
        log::debug!("failed to parse signature before extending: {e}");
        LogSigError::new(ErrorKind::SigExtend)
    })?;
    let extended = engine.extend_signature(&parsed).map_err(|e| {
        log::debug!("signature extension request failed: {e}");
        LogSigError::new(ErrorKind::SigExtend)
    })?;

    let rewritten = BlockSignature {
        record_count: block_sig.record_count,
        signature_bytes: extended.serialize(),
    };
    Ok(rewritten.encode())
}
