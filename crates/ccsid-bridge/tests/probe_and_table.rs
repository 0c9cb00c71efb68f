//! Encoding-scheme classification and table building

use ccsid_bridge::testing::{FakeCcsid, FakePase};
use ccsid_bridge::{build, classify, Bridge, BridgeError, EncodingScheme};
use proptest::prelude::*;
use rstest::rstest;

// ===== Classification =====

#[rstest]
#[case(37, EncodingScheme::SingleByte)]
#[case(500, EncodingScheme::SingleByte)]
#[case(300, EncodingScheme::DoubleByte)]
#[case(1200, EncodingScheme::Unsupported)]
#[case(4242, EncodingScheme::Unsupported)]
fn test_classify(#[case] ccsid: u32, #[case] expected: EncodingScheme) {
    let bridge = Bridge::new(FakePase::new());
    assert_eq!(classify(&bridge, ccsid).unwrap(), expected);
}

#[test]
fn test_classify_is_repeatable() {
    let bridge = Bridge::new(FakePase::new());
    let first = classify(&bridge, 37).unwrap();
    let second = classify(&bridge, 37).unwrap();
    assert_eq!(first, second);
    assert_eq!(bridge.primitives().calls("_RSLOBJ2"), 1);
    assert_eq!(bridge.primitives().calls("QTQGESP"), 2);
}

#[test]
fn test_program_failure_is_not_unsupported() {
    let sys = FakePase::new().with_ccsid(9000, FakeCcsid::ProgramFailure);
    let bridge = Bridge::new(sys);
    let err = classify(&bridge, 9000).unwrap_err();
    assert!(err.is_invocation());
}

// ===== Table Building =====

#[test]
fn test_single_byte_table_has_256_entries() {
    let bridge = Bridge::new(FakePase::new());
    let table = build(&bridge, 37, EncodingScheme::SingleByte).unwrap();

    assert_eq!(table.ccsid(), 37);
    assert_eq!(table.scheme(), EncodingScheme::SingleByte);
    assert_eq!(table.len(), 256);
    for (_, bytes) in table.iter() {
        assert!(bytes.is_empty() || bytes.len() == 2);
    }
    assert_eq!(bridge.primitives().open_descriptors(), 0);
}

#[test]
fn test_double_byte_table_has_65536_entries() {
    let bridge = Bridge::new(FakePase::new());
    let table = build(&bridge, 300, EncodingScheme::DoubleByte).unwrap();

    assert_eq!(table.len(), 65536);
    assert_eq!(table.get(0x4040), Some(&[0x30, 0x00][..]));
    assert_eq!(table.get(0x4481).map(<[u8]>::len), Some(4));
    assert_eq!(bridge.primitives().calls("iconv"), 65536);
}

#[test]
fn test_errors_are_kept_in_table() {
    let bridge = Bridge::new(FakePase::new());
    let table = build(&bridge, 37, EncodingScheme::SingleByte).unwrap();

    assert_eq!(table.get(0xCA).map(<[u8]>::is_empty), Some(true));
    assert_eq!(table.len(), 256);
    assert_eq!(table.get(0xC1), Some(&[0x00, 0x41][..]));
}

#[test]
fn test_open_failure_builds_nothing() {
    let bridge = Bridge::new(FakePase::new());
    let err = build(&bridge, 290, EncodingScheme::SingleByte).unwrap_err();
    assert!(matches!(err, BridgeError::OpenFailure { source_ccsid: 290, .. }));
    assert_eq!(bridge.primitives().calls("iconv"), 0);
}

#[test]
fn test_conversion_exception_still_releases_descriptor() {
    let sys = FakePase::new();
    sys.fail_procedure("iconv", -1);
    let bridge = Bridge::new(sys);

    let err = build(&bridge, 37, EncodingScheme::SingleByte).unwrap_err();
    assert!(err.is_invocation());
    assert_eq!(bridge.primitives().open_descriptors(), 0);
    assert_eq!(bridge.primitives().closed_descriptors(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_single_byte_entries_match_direct_conversion(byte in any::<u8>()) {
        let bridge = Bridge::new(FakePase::new());
        let table = build(&bridge, 500, EncodingScheme::SingleByte).unwrap();
        let expected: Vec<u8> = ccsid_bridge::testing::single_byte_char(byte)
            .map(|c| {
                let mut units = [0u16; 2];
                c.encode_utf16(&mut units)
                    .iter()
                    .flat_map(|u| u.to_be_bytes())
                    .collect()
            })
            .unwrap_or_default();
        prop_assert_eq!(table.get(byte as usize), Some(expected.as_slice()));
    }
}
