//! Access-unit format detection and splitting.

use bitscope::{AccessUnit, AccessUnitFormat, BitscopeError, ObuHeader, UnitExtractor, split_packet};

// ── Format guessing ────────────────────────────────────────────────

#[test]
fn guess_four_byte_start_code() {
    let data = [0, 0, 0, 1, 0x40, 0x01];
    assert_eq!(AccessUnitFormat::guess(&data), Some(AccessUnitFormat::StartCode));
}

#[test]
fn guess_three_byte_start_code() {
    let data = [0, 0, 1, 0x40, 0x01];
    assert_eq!(AccessUnitFormat::guess(&data), Some(AccessUnitFormat::StartCode));
}

#[test]
fn guess_length_prefixed_when_lengths_fill_buffer() {
    let data = [0, 0, 0, 2, 0x40, 0x01, 0, 0, 0, 1, 0x42];
    assert_eq!(
        AccessUnitFormat::guess(&data),
        Some(AccessUnitFormat::LengthPrefixed)
    );
}

#[test]
fn guess_obu_sequence() {
    // Temporal delimiter with an empty payload, then a 2-byte frame OBU.
    let data = [0x13, 0x00, 0x33, 0x02, 0xaa, 0xbb];
    assert_eq!(AccessUnitFormat::guess(&data), Some(AccessUnitFormat::Obu));
}

#[test]
fn guess_rejects_short_and_unknown_data() {
    assert_eq!(AccessUnitFormat::guess(&[0, 0, 1]), None);
    assert_eq!(AccessUnitFormat::guess(&[0xff; 8]), None);
}

// ── OBU headers ────────────────────────────────────────────────────

#[test]
fn obu_header_with_size_field() {
    let header = ObuHeader::parse(&[0x33, 0x02, 0xaa, 0xbb], 0).unwrap();
    assert_eq!(header.obu_type, 6);
    assert_eq!(header.extension, None);
    assert_eq!(header.obu_size, Some(2));
    assert_eq!(header.header_bytes, 2);
}

#[test]
fn obu_header_with_extension() {
    let header = ObuHeader::parse(&[0x35, 0x48], 0).unwrap();
    assert_eq!(header.obu_type, 6);
    assert_eq!(header.extension, Some((2, 1)));
    assert_eq!(header.obu_size, None);
    assert_eq!(header.header_bytes, 2);
}

#[test]
fn obu_header_multi_byte_size() {
    let header = ObuHeader::parse(&[0x33, 0x80, 0x01], 0).unwrap();
    assert_eq!(header.obu_size, Some(128));
    assert_eq!(header.header_bytes, 3);
}

#[test]
fn obu_header_at_offset() {
    let header = ObuHeader::parse(&[0xff, 0xff, 0x13, 0x00], 2).unwrap();
    assert_eq!(header.obu_type, 2);
    assert_eq!(header.obu_size, Some(0));
}

#[test]
fn obu_header_rejects_forbidden_bit() {
    match ObuHeader::parse(&[0x80, 0x00], 0) {
        Err(BitscopeError::InvalidField { field, .. }) => assert_eq!(field, "obu_forbidden_bit"),
        other => panic!("Expected InvalidField, got: {other:?}"),
    }
}

#[test]
fn obu_header_requires_reserved_bit() {
    match ObuHeader::parse(&[0x12, 0x00], 0) {
        Err(BitscopeError::InvalidField { field, .. }) => assert_eq!(field, "obu_reserved_1bit"),
        other => panic!("Expected InvalidField, got: {other:?}"),
    }
}

#[test]
fn obu_header_truncated() {
    let result = ObuHeader::parse(&[0x33], 0);
    assert!(matches!(
        result,
        Err(BitscopeError::BitstreamExhausted { .. })
    ));
}

// ── Start codes ────────────────────────────────────────────────────

#[test]
fn start_code_units_mixed_code_lengths() {
    let payload = [
        0, 0, 0, 1, 0x40, 0x01, // VPS, 4-byte code
        0, 0, 1, 0x42, 0x01, // SPS, 3-byte code
        0, 0, 0, 1, 0x44, 0x01, // PPS, 4-byte code
    ];
    let units = split_packet(AccessUnitFormat::StartCode, &payload);
    assert_eq!(
        units,
        vec![
            AccessUnit { offset: 4, len: 2 },
            AccessUnit { offset: 9, len: 2 },
            AccessUnit { offset: 15, len: 2 },
        ]
    );
    assert_eq!(units[1].slice(&payload), &[0x42, 0x01]);
}

#[test]
fn extractor_walks_units_and_drains() {
    let payload = [0, 0, 0, 1, 0x40, 0x01, 0, 0, 1, 0x42, 0x01];
    let mut extractor = UnitExtractor::new(Some(AccessUnitFormat::StartCode));
    extractor.load_packet(&payload);
    assert!(!extractor.is_drained());

    let first = extractor.advance().unwrap();
    assert_eq!(first.range(), 4..6);
    assert_eq!(extractor.last_unit(), &[0x40, 0x01]);
    assert_eq!(extractor.cursor(), 6);

    extractor.advance().unwrap();
    assert_eq!(extractor.last_unit(), &[0x42, 0x01]);
    assert_eq!(extractor.last_span(), Some(AccessUnit { offset: 9, len: 2 }));
    assert!(extractor.is_drained());
    assert!(extractor.advance().is_none());
}

#[test]
fn start_code_missing_discards_packet() {
    let mut extractor = UnitExtractor::new(Some(AccessUnitFormat::StartCode));
    extractor.load_packet(&[0x40, 0x01, 0x02, 0x03]);
    assert!(extractor.advance().is_none());
    assert!(extractor.is_drained());
}

// ── Length prefixes ────────────────────────────────────────────────

#[test]
fn length_prefixed_units() {
    let payload = [0, 0, 0, 2, 0x40, 0x01, 0, 0, 0, 1, 0x42];
    let units = split_packet(AccessUnitFormat::LengthPrefixed, &payload);
    assert_eq!(
        units,
        vec![
            AccessUnit { offset: 4, len: 2 },
            AccessUnit { offset: 10, len: 1 },
        ]
    );
}

#[test]
fn length_prefixed_stops_at_oversized_length() {
    let payload = [0, 0, 0, 1, 0xaa, 0, 0, 0, 5, 0xbb];
    let units = split_packet(AccessUnitFormat::LengthPrefixed, &payload);
    assert_eq!(units, vec![AccessUnit { offset: 4, len: 1 }]);
}

#[test]
fn length_prefixed_short_tail_is_malformed() {
    let mut extractor = UnitExtractor::new(Some(AccessUnitFormat::LengthPrefixed));
    extractor.load_packet(&[0, 0, 1]);
    assert!(extractor.advance().is_none());
    assert!(extractor.is_drained());
}

// ── OBUs ───────────────────────────────────────────────────────────

#[test]
fn obu_units_include_headers() {
    let payload = [0x13, 0x00, 0x33, 0x02, 0xaa, 0xbb];
    let units = split_packet(AccessUnitFormat::Obu, &payload);
    assert_eq!(
        units,
        vec![
            AccessUnit { offset: 0, len: 2 },
            AccessUnit { offset: 2, len: 4 },
        ]
    );
}

#[test]
fn obu_without_size_field_takes_rest() {
    let payload = [0x31, 0xaa, 0xbb];
    let units = split_packet(AccessUnitFormat::Obu, &payload);
    assert_eq!(units, vec![AccessUnit { offset: 0, len: 3 }]);
}

#[test]
fn obu_declaring_too_many_bytes_is_clamped() {
    let payload = [0x33, 0x05, 0xaa];
    let units = split_packet(AccessUnitFormat::Obu, &payload);
    assert_eq!(units, vec![AccessUnit { offset: 0, len: 3 }]);
}

// ── Extractor state ────────────────────────────────────────────────

#[test]
fn format_is_fixed_once_set() {
    let mut extractor = UnitExtractor::new(None);
    assert_eq!(extractor.format(), None);

    extractor.set_format(Some(AccessUnitFormat::Obu));
    extractor.set_format(Some(AccessUnitFormat::StartCode));
    assert_eq!(extractor.format(), Some(AccessUnitFormat::Obu));
}

#[test]
fn unknown_format_yields_nothing() {
    let mut extractor = UnitExtractor::new(None);
    extractor.load_packet(&[0, 0, 0, 1, 0x40]);
    assert!(extractor.advance().is_none());
    assert!(extractor.is_drained());
}

#[test]
fn clear_discards_rest_of_packet() {
    let mut extractor = UnitExtractor::new(Some(AccessUnitFormat::StartCode));
    extractor.load_packet(&[0, 0, 0, 1, 0x40, 0x01, 0, 0, 1, 0x42, 0x01]);
    extractor.advance().unwrap();
    extractor.clear();
    assert!(extractor.is_drained());
    assert_eq!(extractor.cursor(), 0);
    // The last unit survives a clear.
    assert_eq!(extractor.last_unit(), &[0x40, 0x01]);
}

#[test]
fn format_display() {
    assert_eq!(AccessUnitFormat::StartCode.to_string(), "Annex-B start codes");
    assert_eq!(AccessUnitFormat::LengthPrefixed.to_string(), "length-prefixed");
    assert_eq!(AccessUnitFormat::Obu.to_string(), "OBU");
}
