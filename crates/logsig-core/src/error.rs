//! Error kinds and diagnostic context for log-signature verification.
//!
//! Mirrors the exhaustive error-code enum of the underlying signature
//! format so that a caller printing a decoded [`ErrorKind`] always has a
//! name for every failure the format itself can produce, even the ones
//! this crate never constructs on its own (`Success`, `OutOfMemory`).

use thiserror::Error;

use crate::imprint::Imprint;

/// Every distinct failure (and the one non-failure, `Success`) the format defines.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation completed without error. Never returned inside a `Result::Err`;
    /// kept so diagnostic code matching on `ErrorKind` stays exhaustive.
    #[error("success")]
    Success,
    /// Clean end of stream at a record boundary.
    #[error("end of file")]
    Eof,
    /// I/O failure reading or writing the stream.
    #[error("I/O error")]
    Io,
    /// Allocation failed. Never returned by this crate (the allocator aborts).
    #[error("out of memory")]
    OutOfMemory,
    /// The 8-byte file magic did not match what the caller expected.
    #[error("invalid file header")]
    InvalidHeader,
    /// A TLV type code was not one this decoder understands in context.
    #[error("invalid TLV type")]
    InvalidType,
    /// A TLV length was inconsistent: child overran parent, or trailing bytes remained.
    #[error("invalid TLV length")]
    Len,
    /// A primitive value (integer, imprint) was malformed.
    #[error("malformed value")]
    Fmt,
    /// Block ended without a block-signature TLV.
    #[error("missing block signature")]
    MissBlockSig,
    /// Block header declared per-record hashes present but one was missing.
    #[error("missing record hash")]
    MissRecHash,
    /// Forest produced an intermediate node but no tree-hash TLV was present.
    #[error("missing tree hash")]
    MissTreeHash,
    /// A record-hash imprint used an algorithm id that didn't match the block header.
    #[error("record hash uses wrong algorithm")]
    InvalidRecHashId,
    /// A record-hash imprint didn't match the recomputed leaf hash.
    #[error("record hash mismatch")]
    InvalidRecHash,
    /// A tree-hash imprint used an algorithm id that didn't match the block header.
    #[error("tree hash uses wrong algorithm")]
    InvalidTreeHashId,
    /// A tree-hash imprint didn't match the recomputed intermediate hash.
    #[error("tree hash mismatch")]
    InvalidTreeHash,
    /// The signature's declared record count didn't match the records actually consumed.
    #[error("record count mismatch")]
    InvalidRecordCount,
    /// The signature failed to parse or failed verification against the block root.
    #[error("invalid signature")]
    InvalidSignature,
    /// Extending the signature against the extending service failed.
    #[error("signature extension failed")]
    SigExtend,
    /// The signature engine failed to compute a leaf or node hash.
    #[error("hash computation failed")]
    CreateHash,
    /// The signature engine failed to serialize a signature.
    #[error("DER encoding failed")]
    DerEncode,
    /// Hash-chain extraction failed to locate the requested record.
    #[error("extraction failed")]
    ExtractHash,
}

/// Diagnostic back-references attached to an error: filename, the
/// block/record counters in effect when it was detected, and (for hash
/// mismatches) both the computed and the stream-stored values.
///
/// Owns its data (rather than borrowing, as the format's original C
/// implementation does) so `LogSigError` stays `'static` and can cross
/// `?` boundaries freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Name of the file being verified, if known.
    pub file_name: Option<String>,
    /// Zero-based index of the block in which the error occurred.
    pub block_no: u64,
    /// Zero-based index of the record within the current block.
    pub record_no: u64,
    /// Zero-based index of the record within the whole file.
    pub record_no_in_file: u64,
    /// The hash this crate computed, when the error is a hash mismatch.
    pub computed: Option<Imprint>,
    /// The hash read from the stream, when the error is a hash mismatch.
    pub file: Option<Imprint>,
    /// Numeric status code returned by the signature engine, if any.
    pub adapter_status: Option<i64>,
}

impl ErrorContext {
    /// A context carrying nothing but the current block/record position.
    #[must_use]
    pub fn at(block_no: u64, record_no: u64, record_no_in_file: u64) -> Self {
        Self {
            block_no,
            record_no,
            record_no_in_file,
            ..Self::default()
        }
    }

    /// Attach computed/file hash values for a mismatch diagnostic.
    #[must_use]
    pub fn with_hashes(mut self, computed: Imprint, file: Imprint) -> Self {
        self.computed = Some(computed);
        self.file = Some(file);
        self
    }

    /// Attach the file name being verified.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

/// An [`ErrorKind`] plus the diagnostic context current when it fired.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}{}", context.as_ref().map(ErrorContext::describe).unwrap_or_default())]
pub struct LogSigError {
    /// Which of the exhaustive failure kinds this is.
    pub kind: ErrorKind,
    /// Diagnostic back-references, when available.
    pub context: Option<ErrorContext>,
}

impl ErrorContext {
    fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.file_name {
            out.push_str(&format!(" in {name}"));
        }
        out.push_str(&format!(
            " (block {}, record {}, record-in-file {})",
            self.block_no, self.record_no, self.record_no_in_file
        ));
        if let (Some(computed), Some(file)) = (&self.computed, &self.file) {
            out.push_str(&format!(
                ": computed {} != file {}",
                hex::encode(&computed.data),
                hex::encode(&file.data)
            ));
        }
        out
    }
}

impl LogSigError {
    /// Build an error with no diagnostic context attached.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Build an error carrying the given diagnostic context.
    #[must_use]
    pub fn with_context(kind: ErrorKind, context: ErrorContext) -> Self {
        Self {
            kind,
            context: Some(context),
        }
    }
}

impl From<std::io::Error> for LogSigError {
    fn from(err: std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ErrorKind::Eof
        } else {
            ErrorKind::Io
        };
        log::debug!("I/O error while reading log-signature stream: {err}");
        Self::new(kind)
    }
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, LogSigError>;
