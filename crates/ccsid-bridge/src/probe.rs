//! Encoding-scheme classification of a CCSID
//!
//! The `QTQGESP` program reports the encoding scheme of a CCSID. Only pure
//! single-byte (`0x1100`) and pure double-byte (`0x1200`) EBCDIC schemes can be
//! enumerated codepoint by codepoint; everything else is unsupported.

use crate::error::BridgeResult;
use crate::ffi::caller::Bridge;
use crate::ffi::primitives::PasePrimitives;
use crate::ffi::types::CallFlags;
use crate::iconv::session::ccsid_field;
use std::ffi::c_void;
use std::fmt;
use tracing::debug;

/// Library and name of the encoding-scheme program
pub const ENCODING_SCHEME_PROGRAM: (&str, &str) = ("QSYS", "QTQGESP");

pub const SCHEME_EBCDIC_SBCS: i32 = 0x1100;
pub const SCHEME_EBCDIC_DBCS: i32 = 0x1200;

/// Capacity of the character-set/code-page list passed to `QTQGESP`
const CSPL_CAPACITY: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingScheme {
    SingleByte,
    DoubleByte,
    Unsupported,
}

impl EncodingScheme {
    /// Raw scheme value, for supported schemes
    pub fn code(&self) -> Option<u16> {
        match self {
            EncodingScheme::SingleByte => Some(SCHEME_EBCDIC_SBCS as u16),
            EncodingScheme::DoubleByte => Some(SCHEME_EBCDIC_DBCS as u16),
            EncodingScheme::Unsupported => None,
        }
    }

    /// Bytes per codepoint
    pub fn width(&self) -> usize {
        match self {
            EncodingScheme::SingleByte => 1,
            EncodingScheme::DoubleByte => 2,
            EncodingScheme::Unsupported => 0,
        }
    }

    /// Number of codepoints in a full table
    pub fn codepoint_count(&self) -> usize {
        match self {
            EncodingScheme::SingleByte => 0x100,
            EncodingScheme::DoubleByte => 0x1_0000,
            EncodingScheme::Unsupported => 0,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, EncodingScheme::Unsupported)
    }

    fn from_code(code: i32) -> Self {
        match code {
            SCHEME_EBCDIC_SBCS => EncodingScheme::SingleByte,
            SCHEME_EBCDIC_DBCS => EncodingScheme::DoubleByte,
            _ => EncodingScheme::Unsupported,
        }
    }
}

impl fmt::Display for EncodingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingScheme::SingleByte => write!(f, "single-byte"),
            EncodingScheme::DoubleByte => write!(f, "double-byte"),
            EncodingScheme::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Classify `ccsid` by calling `QTQGESP`
///
/// A CCSID the system does not know (nonzero feedback) is `Unsupported`; a
/// failing program call is an error.
pub fn classify<P: PasePrimitives>(bridge: &Bridge<P>, ccsid: u32) -> BridgeResult<EncodingScheme> {
    let mut ccsid_in = ccsid_field(ccsid)?;
    let (library, program) = ENCODING_SCHEME_PROGRAM;
    let handle = bridge.resolve_program(library, program)?;

    let mut cspl_capacity = CSPL_CAPACITY;
    let mut cspl_count: i32 = 0;
    let mut scheme: i32 = 0;
    let mut cspl = [0i32; CSPL_CAPACITY as usize];
    let mut feedback = [0i32; 3];

    let args: [*mut c_void; 6] = [
        &mut ccsid_in as *mut i32 as *mut c_void,
        &mut cspl_capacity as *mut i32 as *mut c_void,
        &mut cspl_count as *mut i32 as *mut c_void,
        &mut scheme as *mut i32 as *mut c_void,
        cspl.as_mut_ptr() as *mut c_void,
        feedback.as_mut_ptr() as *mut c_void,
    ];
    unsafe {
        bridge.call_program(&handle, &args, CallFlags::PGMCALL_EXCP_NOSIGNAL)?;
    }

    if feedback.iter().any(|&f| f != 0) {
        debug!(ccsid, ?feedback, "no encoding scheme");
        return Ok(EncodingScheme::Unsupported);
    }

    let classified = EncodingScheme::from_code(scheme);
    if !classified.is_supported() {
        debug!(ccsid, scheme = format_args!("{:04x}", scheme), "unsupported encoding scheme");
    }
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePase;

    #[test]
    fn test_scheme_dimensions() {
        assert_eq!(EncodingScheme::SingleByte.codepoint_count(), 256);
        assert_eq!(EncodingScheme::SingleByte.width(), 1);
        assert_eq!(EncodingScheme::DoubleByte.codepoint_count(), 65536);
        assert_eq!(EncodingScheme::DoubleByte.width(), 2);
        assert_eq!(EncodingScheme::Unsupported.code(), None);
    }

    #[test]
    fn test_scheme_codes() {
        assert_eq!(EncodingScheme::SingleByte.code(), Some(0x1100));
        assert_eq!(EncodingScheme::DoubleByte.code(), Some(0x1200));
    }

    #[test]
    fn test_classify_passes_no_signal() {
        let bridge = Bridge::new(FakePase::new());
        classify(&bridge, 37).unwrap();
        assert_eq!(
            bridge.primitives().last_flags("QTQGESP"),
            Some(CallFlags::PGMCALL_EXCP_NOSIGNAL.bits())
        );
    }

    #[test]
    fn test_other_scheme_is_unsupported() {
        let bridge = Bridge::new(FakePase::new());
        // UTF-16 reports a scheme of its own
        assert_eq!(classify(&bridge, 1200).unwrap(), EncodingScheme::Unsupported);
    }

    #[test]
    fn test_out_of_range_ccsid_rejected_before_calling() {
        let bridge = Bridge::new(FakePase::new());
        let result = classify(&bridge, u32::MAX);
        assert!(matches!(result, Err(crate::error::BridgeError::InvalidInput(_))));
        assert_eq!(bridge.primitives().calls("QTQGESP"), 0);
        assert_eq!(bridge.primitives().calls("_RSLOBJ2"), 0);
    }
}
