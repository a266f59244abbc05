//! Property-based tests for the TLV codec and integer encoding.
//!
//! Mirrors the teacher's `proptest_protocol.rs`: crash-safety properties
//! (never panic on arbitrary bytes) alongside round-trip laws for
//! well-formed input.

use logsig_core::tlv::{self, Record};
use proptest::prelude::*;

proptest! {
    /// `read_record` never panics on arbitrary bytes; it always returns
    /// either a record, a clean EOF, or an error.
    #[test]
    fn read_record_never_panics(data in prop::collection::vec(any::<u8>(), 0..4096)) {
        let _ = tlv::read_record(&mut &data[..]);
    }

    /// Any record built from an arbitrary type/payload round-trips
    /// through `write_record`/`read_record` byte-exactly, as long as
    /// the type fits the 13-bit type space the codec supports.
    #[test]
    fn tlv_round_trips(
        tlv_type in 0u16..0x1FFF,
        payload in prop::collection::vec(any::<u8>(), 0..300),
    ) {
        let rec = Record::new(tlv_type, payload);
        let mut buf = Vec::new();
        tlv::write_record(&mut buf, &rec).unwrap();
        let mut cursor = &buf[..];
        let decoded = tlv::read_record(&mut cursor).unwrap().unwrap();
        prop_assert_eq!(decoded, rec);

        // No trailing bytes left over.
        prop_assert_eq!(tlv::read_record(&mut cursor).unwrap(), None);
    }

    /// Integers encode to the minimal big-endian form and round-trip.
    #[test]
    fn uint_round_trips(n in any::<u64>()) {
        let encoded = tlv::encode_uint(n);
        prop_assert!(!encoded.is_empty());
        if n != 0 {
            prop_assert_ne!(encoded[0], 0);
        }
        prop_assert_eq!(tlv::decode_uint(&encoded).unwrap(), n);
    }

    /// `decode_uint` never panics on arbitrary byte slices.
    #[test]
    fn decode_uint_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..16)) {
        let _ = tlv::decode_uint(&bytes);
    }
}
