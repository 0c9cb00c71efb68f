//! Conversion sessions and errno retrieval

use ccsid_bridge::iconv::{CodecSession, ICONV_ERROR};
use ccsid_bridge::testing::{FakePase, CONVERSION_ERRNO, EXCEPTION_RC, OPEN_ERRNO};
use ccsid_bridge::{Bridge, BridgeError, UTF16_CCSID};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn bridge() -> Bridge<FakePase> {
    Bridge::new(FakePase::new())
}

// ===== Open / Close =====

#[test]
fn test_open_then_close_without_converting() {
    let bridge = bridge();
    let session = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();
    assert_eq!(session.close().unwrap(), 0);
    assert_eq!(bridge.primitives().open_descriptors(), 0);
}

#[test]
fn test_second_open_is_independent() {
    let bridge = bridge();
    let first = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();
    let second = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();

    assert_ne!(first.descriptor(), second.descriptor());
    assert_eq!(bridge.primitives().open_descriptors(), 2);

    first.close().unwrap();
    second.close().unwrap();
    assert_eq!(bridge.primitives().closed_descriptors(), 2);
}

#[test]
fn test_drop_releases_descriptor() {
    let bridge = bridge();
    {
        let mut session = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();
        session.convert(&[0x40]).unwrap();
    }
    assert_eq!(bridge.primitives().open_descriptors(), 0);
    assert_eq!(bridge.primitives().calls("iconv_close"), 1);
}

#[test]
fn test_explicit_close_is_not_repeated_on_drop() {
    let bridge = bridge();
    let session = CodecSession::open(&bridge, UTF16_CCSID, 500).unwrap();
    session.close().unwrap();
    assert_eq!(bridge.primitives().calls("iconv_close"), 1);
}

#[test]
fn test_open_failure_carries_errno() {
    let bridge = bridge();
    let err = CodecSession::open(&bridge, UTF16_CCSID, 290).unwrap_err();
    match err {
        BridgeError::OpenFailure {
            target_ccsid,
            source_ccsid,
            errno,
        } => {
            assert_eq!(target_ccsid, 1200);
            assert_eq!(source_ccsid, 290);
            assert_eq!(errno, Some(OPEN_ERRNO));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(bridge.primitives().open_descriptors(), 0);
}

#[test]
fn test_open_failure_without_errno_accessor() {
    let sys = FakePase::new();
    sys.remove_object("QSYS/QC2UTIL1");
    let bridge = Bridge::new(sys);

    let err = CodecSession::open(&bridge, UTF16_CCSID, 290).unwrap_err();
    assert!(matches!(err, BridgeError::OpenFailure { errno: None, .. }));
}

#[test]
fn test_open_failure_with_unreadable_errno() {
    let sys = FakePase::new();
    sys.fail_procedure("_MEMCPY_WT2", EXCEPTION_RC);
    let bridge = Bridge::new(sys);

    let err = CodecSession::open(&bridge, UTF16_CCSID, 290).unwrap_err();
    assert!(matches!(err, BridgeError::OpenFailure { errno: None, .. }));
}

#[test]
fn test_open_exception_is_invocation_error() {
    let sys = FakePase::new();
    sys.fail_procedure("QtqIconvOpen", EXCEPTION_RC);
    let bridge = Bridge::new(sys);

    let err = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap_err();
    assert!(err.is_invocation());
    assert!(err.to_string().contains("QSYS/QTQICONV(QtqIconvOpen)"));
}

// ===== Conversion =====

#[rstest]
#[case(0x40, &[0x00, 0x20])]
#[case(0xC1, &[0x00, 0x41])]
#[case(0xF0, &[0x00, 0x30])]
#[case(0x4A, &[0x00, 0xA2])]
#[case(0x00, &[0x00, 0x00])]
fn test_single_byte_conversion(#[case] input: u8, #[case] expected: &[u8]) {
    let bridge = bridge();
    let mut session = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();
    let conversion = session.convert(&[input]).unwrap();
    assert_eq!(conversion.status, 0);
    assert_eq!(conversion.output, expected);
}

#[test]
fn test_unmapped_codepoint_reports_status() {
    let bridge = bridge();
    let mut session = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();
    let conversion = session.convert(&[0xCA]).unwrap();

    assert!(conversion.is_error());
    assert_eq!(conversion.status, ICONV_ERROR);
    assert!(conversion.output.is_empty());
    assert_eq!(bridge.foreign_errno().unwrap(), CONVERSION_ERRNO);
}

#[test]
fn test_double_byte_surrogate_pair() {
    let bridge = bridge();
    let mut session = CodecSession::open(&bridge, UTF16_CCSID, 300).unwrap();
    let conversion = session.convert(&[0x44, 0x81]).unwrap();
    assert_eq!(conversion.output, vec![0xD8, 0x3D, 0xDE, 0x00]);
}

#[test]
fn test_every_call_suppresses_signals() {
    let bridge = bridge();
    let mut session = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();
    session.convert(&[0x40]).unwrap();
    session.close().unwrap();

    for procedure in ["QtqIconvOpen", "iconv", "iconv_close"] {
        assert_eq!(bridge.primitives().last_flags(procedure), Some(0x20));
    }
}

// ===== Errno =====

#[test]
fn test_errno_round_trip() {
    let bridge = bridge();
    bridge.primitives().set_errno(0x0102_0304);
    assert_eq!(bridge.foreign_errno().unwrap(), 0x0102_0304);
    assert_eq!(bridge.primitives().calls("_MEMCPY_WT2"), 1);
}
