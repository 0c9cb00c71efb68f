//! Full conversion tables of single- and double-byte CCSIDs

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::caller::Bridge;
use crate::ffi::primitives::PasePrimitives;
use crate::iconv::{CodecSession, UTF16_CCSID};
use crate::probe::EncodingScheme;
use tracing::{debug, info};

/// UTF-16BE output of every codepoint of a CCSID, in codepoint order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodepageTable {
    ccsid: u32,
    scheme: EncodingScheme,
    entries: Vec<Vec<u8>>,
}

impl CodepageTable {
    /// Table from already converted entries
    pub fn new(ccsid: u32, scheme: EncodingScheme, entries: Vec<Vec<u8>>) -> BridgeResult<Self> {
        if !scheme.is_supported() {
            return Err(BridgeError::UnsupportedScheme { ccsid });
        }
        if entries.len() != scheme.codepoint_count() {
            return Err(BridgeError::InvalidInput(format!(
                "{} table needs {} entries, got {}",
                scheme,
                scheme.codepoint_count(),
                entries.len()
            )));
        }
        Ok(Self {
            ccsid,
            scheme,
            entries,
        })
    }

    pub fn ccsid(&self) -> u32 {
        self.ccsid
    }

    pub fn scheme(&self) -> EncodingScheme {
        self.scheme
    }

    /// Converted bytes, indexed by codepoint
    pub fn entries(&self) -> &[Vec<u8>] {
        &self.entries
    }

    pub fn get(&self, codepoint: usize) -> Option<&[u8]> {
        self.entries.get(codepoint).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Codepoint and output pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[u8])> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(cp, bytes)| (cp, bytes.as_slice()))
    }
}

/// Convert every codepoint of `ccsid` to UTF-16
pub fn build<P: PasePrimitives>(
    bridge: &Bridge<P>,
    ccsid: u32,
    scheme: EncodingScheme,
) -> BridgeResult<CodepageTable> {
    build_with_target(bridge, ccsid, scheme, UTF16_CCSID)
}

/// Like [`build`], converting to a CCSID other than UTF-16
pub fn build_with_target<P: PasePrimitives>(
    bridge: &Bridge<P>,
    ccsid: u32,
    scheme: EncodingScheme,
    target: u32,
) -> BridgeResult<CodepageTable> {
    if !scheme.is_supported() {
        return Err(BridgeError::UnsupportedScheme { ccsid });
    }

    let mut session = CodecSession::open(bridge, target, ccsid)?;
    let width = scheme.width();
    let count = scheme.codepoint_count();
    debug!(ccsid, %scheme, count, "building table");

    let mut entries = Vec::with_capacity(count);
    let mut errors = 0;
    for codepoint in 0..count {
        let encoded = (codepoint as u32).to_be_bytes();
        let conversion = session.convert(&encoded[4 - width..])?;
        if conversion.is_error() {
            errors += 1;
        }
        entries.push(conversion.output);
    }

    session.close()?;
    info!(ccsid, entries = entries.len(), errors, "built table");

    Ok(CodepageTable {
        ccsid,
        scheme,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePase;

    #[test]
    fn test_unsupported_scheme_rejected_without_opening() {
        let bridge = Bridge::new(FakePase::new());
        let result = build(&bridge, 37, EncodingScheme::Unsupported);
        assert!(matches!(result, Err(BridgeError::UnsupportedScheme { ccsid: 37 })));
        assert_eq!(bridge.primitives().calls("QtqIconvOpen"), 0);
    }

    #[test]
    fn test_new_checks_entry_count() {
        let result = CodepageTable::new(37, EncodingScheme::SingleByte, vec![Vec::new(); 255]);
        assert!(matches!(result, Err(BridgeError::InvalidInput(_))));

        let table = CodepageTable::new(37, EncodingScheme::SingleByte, vec![Vec::new(); 256]);
        assert_eq!(table.unwrap().len(), 256);
    }

    #[test]
    fn test_single_byte_inputs_are_one_byte() {
        let bridge = Bridge::new(FakePase::new());
        let table = build(&bridge, 37, EncodingScheme::SingleByte).unwrap();
        assert_eq!(table.len(), 256);
        assert_eq!(table.get(0x40), Some(&[0x00, 0x20][..]));
        assert_eq!(table.get(0xC1), Some(&[0x00, 0x41][..]));
    }
}
