//! Verification core for GuardTime/KSI-style log-signature files.
//!
//! This crate implements the record-level primitives a log-signature
//! consumer needs: decoding the TLV wire format, rebuilding a block's
//! Merkle tree over its records, checking the resulting root against a
//! block's signature, extending a signature against a later
//! publication, and extracting a single record's hash chain for
//! stand-alone excerpt verification. It deliberately stops short of any
//! real timestamping protocol — [`engine::SignatureEngine`] is the seam
//! a caller plugs a real adapter into, and [`testing::MockEngine`]
//! exists only so this crate (and downstream integration tests) can
//! exercise the seam without one.
//!
//! # Example
//!
//! ```rust
//! use logsig_core::config::Config;
//! use logsig_core::testing::{self, MockEngine};
//! use logsig_core::verifier::Verifier;
//! use std::io::Cursor;
//!
//! let engine = MockEngine::new();
//! let zero_root = logsig_core::Imprint::new(testing::MOCK_ALGO_SHA256, vec![0u8; 32]);
//! let built = testing::build_block(&engine, &[b"hello"], &zero_root, true, false);
//!
//! let mut stream = built.header.clone();
//! stream.extend_from_slice(&built.body);
//! let mut cursor = Cursor::new(stream.as_slice());
//!
//! let verifier = Verifier::new(engine, Config::default());
//! let (_params, mut session) = verifier.begin_block(&mut cursor, 0, 0, None).unwrap();
//! session.verify_record(&mut cursor, b"hello").unwrap();
//! let root = session.finalize(&mut cursor).unwrap();
//! assert_eq!(root, built.root);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod excerpt;
pub mod extend;
pub mod extractor;
pub mod forest;
pub mod imprint;
pub mod objects;
/// Synthetic test data and a `sha2`-based [`engine::SignatureEngine`] stand-in.
pub mod testing;
pub mod tlv;
pub mod verifier;

pub use config::{Config, ConfigBuilder};
pub use engine::{Signature, SignatureEngine};
pub use error::{ErrorContext, ErrorKind, LogSigError, Result};
pub use excerpt::{scan_excerpt_group, verify_excerpt, ExcerptContext, ExcerptGroup};
pub use extend::extend_block_signature;
pub use extractor::Extractor;
pub use forest::{CarryNode, MerkleForest};
pub use imprint::Imprint;
pub use objects::{BlockHeader, BlockSignature, ExcerptSignature, HashChain, Step};
pub use verifier::{BlockParams, BlockSession, RecordOutcome, Verifier};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
