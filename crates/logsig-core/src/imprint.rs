//! Algorithm-tagged hash values.

use crate::error::{ErrorKind, LogSigError, Result};

/// An octet sequence tagged with the hash-algorithm that produced it.
///
/// Invariant: `data.len() == digest_length(algo_id)` for any `Imprint`
/// that has passed through [`Imprint::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Imprint {
    /// Algorithm identifier, as used on the wire (e.g. `0x01` for SHA-256).
    pub algo_id: u8,
    /// The digest bytes themselves.
    pub data: Vec<u8>,
}

impl Imprint {
    /// Build an imprint without validating `data`'s length against the algorithm.
    #[must_use]
    pub fn new(algo_id: u8, data: Vec<u8>) -> Self {
        Self { algo_id, data }
    }

    /// Wire form: one algorithm byte followed by the digest.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.data.len());
        out.push(self.algo_id);
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode from wire form, checking `data`'s length against `digest_length`.
    pub fn decode(bytes: &[u8], digest_length: impl Fn(u8) -> Option<usize>) -> Result<Self> {
        let (algo_id, rest) = bytes
            .split_first()
            .ok_or(LogSigError::new(ErrorKind::Fmt))?;
        let expected = digest_length(*algo_id).ok_or(LogSigError::new(ErrorKind::InvalidRecHashId))?;
        if rest.len() != expected {
            return Err(LogSigError::new(ErrorKind::Fmt));
        }
        Ok(Self {
            algo_id: *algo_id,
            data: rest.to_vec(),
        })
    }
}

impl std::fmt::Display for Imprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}:{}", self.algo_id, hex::encode(&self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_length(algo: u8) -> Option<usize> {
        match algo {
            0x01 => Some(32),
            _ => None,
        }
    }

    #[test]
    fn round_trip() {
        let imprint = Imprint::new(0x01, vec![0xAB; 32]);
        let bytes = imprint.to_bytes();
        assert_eq!(bytes.len(), 33);
        let decoded = Imprint::decode(&bytes, digest_length).unwrap();
        assert_eq!(decoded, imprint);
    }

    #[test]
    fn rejects_wrong_length() {
        let bytes = [0x01u8, 0xAB, 0xCD];
        assert!(Imprint::decode(&bytes, digest_length).is_err());
    }

    #[test]
    fn rejects_unknown_algo() {
        let bytes = [0x02u8; 33];
        assert!(Imprint::decode(&bytes, digest_length).is_err());
    }
}
