//! Parameter-set extraction from `hvcC` / `avcC` records.

use bitscope::{BitscopeError, CodecFamily, extract_parameter_sets};

/// An `hvcC` record with a zeroed 22-byte prefix (version byte 1) followed
/// by the given arrays of NAL units.
fn hvcc(arrays: &[(u8, &[&[u8]])]) -> Vec<u8> {
    let mut record = vec![0u8; 22];
    record[0] = 1;
    record.push(arrays.len() as u8);
    for (nal_type, units) in arrays {
        record.push(*nal_type);
        record.extend_from_slice(&(units.len() as u16).to_be_bytes());
        for unit in *units {
            record.extend_from_slice(&(unit.len() as u16).to_be_bytes());
            record.extend_from_slice(unit);
        }
    }
    record
}

#[test]
fn hevc_record_yields_all_units_in_order() {
    let vps: &[u8] = &[0x40, 0x01, 0x0c];
    let sps: &[u8] = &[0x42, 0x01, 0x01, 0x01];
    let pps: &[u8] = &[0x44, 0x01];
    let record = hvcc(&[(0x20, &[vps]), (0x21, &[sps]), (0x22, &[pps])]);

    let sets = extract_parameter_sets(CodecFamily::Hevc, &record).unwrap();
    assert_eq!(sets, vec![vps.to_vec(), sps.to_vec(), pps.to_vec()]);
}

#[test]
fn hevc_array_with_several_units() {
    let first: &[u8] = &[0x44, 0x01, 0xaa];
    let second: &[u8] = &[0x44, 0x01, 0xbb];
    let record = hvcc(&[(0x22, &[first, second])]);

    let sets = extract_parameter_sets(CodecFamily::Hevc, &record).unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[1], second);
}

#[test]
fn hevc_lengths_use_both_bytes() {
    let long_unit = vec![0x42; 300];
    let record = hvcc(&[(0x21, &[long_unit.as_slice()])]);

    let sets = extract_parameter_sets(CodecFamily::Hevc, &record).unwrap();
    assert_eq!(sets, vec![long_unit]);
}

#[test]
fn hevc_truncated_record_is_an_error() {
    let mut record = hvcc(&[(0x21, &[&[0x42, 0x01, 0x01, 0x01]])]);
    record.truncate(record.len() - 2);

    let result = extract_parameter_sets(CodecFamily::Hevc, &record);
    assert!(matches!(result, Err(BitscopeError::MalformedExtradata(_))));
}

#[test]
fn hevc_header_shorter_than_prefix_is_an_error() {
    let record = [1u8, 0, 0, 0];
    let result = extract_parameter_sets(CodecFamily::Hevc, &record);
    assert!(matches!(result, Err(BitscopeError::MalformedExtradata(_))));
}

#[test]
fn avc_record_yields_sps_then_pps() {
    let record = [
        1, 0x64, 0, 0x1f, 0xff, // version, profile, compat, level, length size
        0xe1, 0, 2, 0x67, 0x64, // one SPS
        2, 0, 1, 0x68, 0, 1, 0x69, // two PPS
    ];
    let sets = extract_parameter_sets(CodecFamily::Avc, &record).unwrap();
    assert_eq!(sets, vec![vec![0x67, 0x64], vec![0x68], vec![0x69]]);
}

#[test]
fn avc_truncated_pps_is_an_error() {
    let record = [1, 0x64, 0, 0x1f, 0xff, 0xe1, 0, 2, 0x67, 0x64, 1, 0, 4, 0x68];
    let result = extract_parameter_sets(CodecFamily::Avc, &record);
    assert!(matches!(result, Err(BitscopeError::MalformedExtradata(_))));
}

#[test]
fn annex_b_extradata_has_no_record() {
    let extradata = [0, 0, 0, 1, 0x67, 0x64, 0, 0, 0, 1, 0x68];
    assert!(
        extract_parameter_sets(CodecFamily::Avc, &extradata)
            .unwrap()
            .is_empty()
    );
    assert!(
        extract_parameter_sets(CodecFamily::Hevc, &extradata)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn other_codecs_have_no_parameter_sets() {
    let record = hvcc(&[(0x21, &[&[0x42, 0x01]])]);
    assert!(
        extract_parameter_sets(CodecFamily::Av1, &record)
            .unwrap()
            .is_empty()
    );
    assert!(
        extract_parameter_sets(CodecFamily::Other, &[])
            .unwrap()
            .is_empty()
    );
}

#[test]
fn codec_family_from_name() {
    assert_eq!(CodecFamily::from_codec_name("hevc"), CodecFamily::Hevc);
    assert_eq!(CodecFamily::from_codec_name("h264"), CodecFamily::Avc);
    assert_eq!(CodecFamily::from_codec_name("libdav1d"), CodecFamily::Av1);
    assert_eq!(CodecFamily::from_codec_name("vp9"), CodecFamily::Other);
}
