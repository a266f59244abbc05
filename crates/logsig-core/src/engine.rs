//! The signature-engine contract this crate verifies against.
//!
//! `logsig-core` never implements the timestamp half of this trait —
//! parsing, verifying and extending real signature tokens (RFC 3161,
//! KSI, or otherwise) is an external collaborator's job. The crate only
//! needs the narrow surface below to drive the Merkle forest and check
//! a block's root against whatever the engine hands back. See
//! [`crate::testing::MockEngine`] for a `sha2`-based stand-in used by
//! this crate's own tests.

use crate::imprint::Imprint;

/// Opaque handle to a parsed signature token. Implementations decide what lives inside.
pub trait Signature: std::fmt::Debug {
    /// Serialize back to the wire form the engine expects to receive again.
    fn serialize(&self) -> Vec<u8>;
}

/// The capability surface the block verifier, extractor and excerpt
/// verifier need from a signature engine.
pub trait SignatureEngine {
    /// Engine-specific signature type.
    type Sig: Signature;
    /// Engine-specific error type, convertible into a numeric status
    /// for [`crate::error::ErrorContext::adapter_status`].
    type Err: std::fmt::Display;

    /// Number of digest bytes produced by `algo_id`, or `None` if unknown.
    fn digest_length(&self, algo_id: u8) -> Option<usize>;

    /// Parse a signature token from its serialized bytes.
    fn parse_signature(&self, bytes: &[u8]) -> Result<Self::Sig, Self::Err>;

    /// Verify a signature is internally well-formed and trusted (without checking it against any particular hash).
    fn verify_signature(&self, sig: &Self::Sig) -> Result<(), Self::Err>;

    /// Verify that `sig` attests to `hash`.
    fn verify_against_hash(&self, sig: &Self::Sig, hash: &Imprint) -> Result<(), Self::Err>;

    /// Obtain a new signature over the same hash, extended against a later publication.
    fn extend_signature(&self, sig: &Self::Sig) -> Result<Self::Sig, Self::Err>;

    /// Compute the leaf hash for record `rec_bytes`, the `n_records`-th
    /// leaf appended to a block seeded with `iv` and chained from `prev_root`.
    fn hash_leaf(
        &self,
        algo_id: u8,
        iv: &[u8],
        prev_root: &Imprint,
        n_records: u64,
        rec_bytes: &[u8],
    ) -> Result<Imprint, Self::Err>;

    /// Combine two child hashes into their parent at the given tree `level`.
    fn hash_node(&self, left: &Imprint, right: &Imprint, level: u8) -> Result<Imprint, Self::Err>;
}
