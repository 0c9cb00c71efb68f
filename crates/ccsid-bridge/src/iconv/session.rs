//! Conversion sessions over `QTQICONV`

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::arglist::{Arglist, ArglistBase};
use crate::ffi::caller::Bridge;
use crate::ffi::loader::SymbolHandle;
use crate::ffi::pointer::{MemPointer, SpacePointer};
use crate::ffi::primitives::{PaseLibc, PasePrimitives};
use crate::ffi::types::{ArgType, CallFlags, ResultType, Signature};
use crate::iconv::layout::{IconvArglist, IconvCloseArglist, IconvOpenArglist, IconvT, QtqCode};
use crate::iconv::{CLOSE_PROCEDURE, CONVERT_PROCEDURE, OPEN_PROCEDURE};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Longest input accepted by [`CodecSession::convert`]
pub const MAX_INPUT: usize = 4;

/// Size of the output buffer handed to `iconv`
pub const OUTPUT_CAPACITY: usize = 8;

/// `iconv` return value signalling a conversion error
pub const ICONV_ERROR: u32 = u32::MAX;

/// Result of converting one codepoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Raw `iconv` return value
    pub status: u32,
    /// Bytes produced, possibly empty
    pub output: Vec<u8>,
}

impl Conversion {
    pub fn is_error(&self) -> bool {
        self.status == ICONV_ERROR
    }
}

/// One open conversion descriptor
///
/// The descriptor is released exactly once: by [`CodecSession::close`], or when
/// the session is dropped.
pub struct CodecSession<'b, P: PasePrimitives = PaseLibc> {
    bridge: &'b Bridge<P>,
    descriptor: IconvT,
    target: u32,
    source: u32,
    convert_fn: Arc<SymbolHandle>,
    close_fn: Arc<SymbolHandle>,
    closed: bool,
}

impl<P: PasePrimitives> std::fmt::Debug for CodecSession<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecSession")
            .field("descriptor", &self.descriptor)
            .field("target", &self.target)
            .field("source", &self.source)
            .field("convert_fn", &self.convert_fn)
            .field("close_fn", &self.close_fn)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<'b, P: PasePrimitives> CodecSession<'b, P> {
    /// Open a converter from CCSID `source` to CCSID `target`
    pub fn open(bridge: &'b Bridge<P>, target: u32, source: u32) -> BridgeResult<Self> {
        let open_fn = resolve(bridge, OPEN_PROCEDURE)?;
        // Resolved before opening so that a descriptor can always be released
        let convert_fn = resolve(bridge, CONVERT_PROCEDURE)?;
        let close_fn = resolve(bridge, CLOSE_PROCEDURE)?;

        let to_code = QtqCode::for_ccsid(ccsid_field(target)?);
        let from_code = QtqCode::for_ccsid(ccsid_field(source)?);

        let mut arglist = IconvOpenArglist {
            base: ArglistBase::default(),
            to_code: MemPointer::to(&to_code),
            from_code: MemPointer::to(&from_code),
        };
        let signature = Signature::new(&[ArgType::MemPtr, ArgType::MemPtr])?;

        let descriptor: IconvT = unsafe {
            bridge.invoke_aggregate(
                &open_fn,
                &mut arglist,
                &signature,
                CallFlags::ILECALL_EXCP_NOSIGNAL,
            )?
        };

        if descriptor.is_open_failure() {
            return Err(BridgeError::OpenFailure {
                target_ccsid: target,
                source_ccsid: source,
                errno: bridge.errno_or_none(),
            });
        }

        debug!(source, target, %descriptor, "opened converter");
        Ok(Self {
            bridge,
            descriptor,
            target,
            source,
            convert_fn,
            close_fn,
            closed: false,
        })
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn source(&self) -> u32 {
        self.source
    }

    pub fn descriptor(&self) -> &IconvT {
        &self.descriptor
    }

    /// Convert the bytes of a single codepoint
    pub fn convert(&mut self, input: &[u8]) -> BridgeResult<Conversion> {
        if input.is_empty() || input.len() > MAX_INPUT {
            return Err(BridgeError::InvalidInput(format!(
                "expected 1 to {} bytes, got {}",
                MAX_INPUT,
                input.len()
            )));
        }

        let mut in_bytes = [0u8; MAX_INPUT];
        in_bytes[..input.len()].copy_from_slice(input);
        let mut out_bytes = [0u8; OUTPUT_CAPACITY];

        // iconv advances these cells; they must stay put until the call returns
        let mut in_cell: SpacePointer = self.bridge.space_pointer(&in_bytes)?;
        let mut out_cell: SpacePointer = self.bridge.space_pointer_mut(&mut out_bytes)?;
        let mut in_left = input.len() as u32;
        let mut out_left = OUTPUT_CAPACITY as u32;

        let mut arglist = IconvArglist {
            base: ArglistBase::default(),
            cd: self.descriptor,
            _pad: [0; 12],
            in_buf: MemPointer::to_mut(&mut in_cell),
            in_len: MemPointer::to_mut(&mut in_left),
            out_buf: MemPointer::to_mut(&mut out_cell),
            out_len: MemPointer::to_mut(&mut out_left),
        };
        let signature = Signature::new(&[
            ArgType::by_value::<IconvT>(),
            ArgType::MemPtr,
            ArgType::MemPtr,
            ArgType::MemPtr,
            ArgType::MemPtr,
        ])?;

        unsafe {
            self.bridge.invoke(
                &self.convert_fn,
                &mut arglist,
                &signature,
                ResultType::UInt32,
                CallFlags::ILECALL_EXCP_NOSIGNAL,
            )?;
        }
        let status = arglist.base().result.uint32();

        if out_left as usize > OUTPUT_CAPACITY {
            return Err(BridgeError::Protocol {
                target: self.convert_fn.to_string(),
                detail: format!(
                    "{} bytes left in an {}-byte buffer",
                    out_left, OUTPUT_CAPACITY
                ),
            });
        }
        let produced = OUTPUT_CAPACITY - out_left as usize;

        trace!(input = ?input, status, produced, "converted");
        Ok(Conversion {
            status,
            output: out_bytes[..produced].to_vec(),
        })
    }

    /// Release the descriptor, returning `iconv_close`'s result
    pub fn close(mut self) -> BridgeResult<i32> {
        self.closed = true;
        self.release()
    }

    fn release(&self) -> BridgeResult<i32> {
        let mut arglist = IconvCloseArglist {
            base: ArglistBase::default(),
            cd: self.descriptor,
            _pad: [0; 12],
        };
        let signature = Signature::new(&[ArgType::by_value::<IconvT>()])?;

        unsafe {
            self.bridge.invoke(
                &self.close_fn,
                &mut arglist,
                &signature,
                ResultType::Int32,
                CallFlags::ILECALL_EXCP_NOSIGNAL,
            )?;
        }
        let rc = arglist.base().result.int32();
        debug!(source = self.source, target = self.target, rc, "closed converter");
        Ok(rc)
    }
}

impl<P: PasePrimitives> Drop for CodecSession<'_, P> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        match self.release() {
            Ok(0) => {}
            Ok(rc) => warn!(source = self.source, rc, "iconv_close reported failure"),
            Err(e) => warn!(source = self.source, error = %e, "could not close converter"),
        }
    }
}

fn resolve<P: PasePrimitives>(
    bridge: &Bridge<P>,
    (library, object, symbol): (&str, &str, &str),
) -> BridgeResult<Arc<SymbolHandle>> {
    bridge.resolve(library, object, symbol)
}

/// CCSID as the `int` field ILE interfaces take
pub(crate) fn ccsid_field(ccsid: u32) -> BridgeResult<i32> {
    i32::try_from(ccsid).map_err(|_| BridgeError::InvalidInput(format!("CCSID {} out of range", ccsid)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iconv::UTF16_CCSID;
    use crate::testing::FakePase;

    #[test]
    fn test_convert_rejects_empty_input() {
        let bridge = Bridge::new(FakePase::new());
        let mut session = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();
        let result = session.convert(&[]);
        assert!(matches!(result, Err(BridgeError::InvalidInput(_))));
    }

    #[test]
    fn test_convert_rejects_long_input() {
        let bridge = Bridge::new(FakePase::new());
        let mut session = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();
        let result = session.convert(&[0x40; 5]);
        assert!(matches!(result, Err(BridgeError::InvalidInput(_))));
    }

    #[test]
    fn test_close_releases_once() {
        let bridge = Bridge::new(FakePase::new());
        let session = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();
        assert_eq!(session.close().unwrap(), 0);
        assert_eq!(bridge.primitives().calls("iconv_close"), 1);
        assert_eq!(bridge.primitives().open_descriptors(), 0);
    }

    #[test]
    fn test_accessors() {
        let bridge = Bridge::new(FakePase::new());
        let session = CodecSession::open(&bridge, UTF16_CCSID, 37).unwrap();
        assert_eq!(session.target(), 1200);
        assert_eq!(session.source(), 37);
        assert!(!session.descriptor().is_open_failure());
    }
}
