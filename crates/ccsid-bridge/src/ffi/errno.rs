//! ILE `errno` retrieval
//!
//! ILE keeps its own thread-local `errno`, separate from PASE's. The C runtime
//! service program exposes it through `__errno()`, which returns a space pointer
//! to the 4-byte cell.

use crate::error::BridgeResult;
use crate::ffi::arglist::ArglistBase;
use crate::ffi::caller::Bridge;
use crate::ffi::pointer::{SpacePointer, TaggedPointer};
use crate::ffi::primitives::PasePrimitives;
use crate::ffi::types::{CallFlags, Signature};
use tracing::warn;

/// Library, service program and export of the errno accessor
pub const ERRNO_PROCEDURE: (&str, &str, &str) = ("QSYS", "QC2UTIL1", "__errno");

impl<P: PasePrimitives> Bridge<P> {
    /// Current value of the ILE `errno`
    pub fn foreign_errno(&self) -> BridgeResult<u32> {
        let (library, object, symbol) = ERRNO_PROCEDURE;
        let accessor = self.resolve(library, object, symbol)?;

        let mut arglist = ArglistBase::default();
        let cell: TaggedPointer = unsafe {
            self.invoke_aggregate(
                &accessor,
                &mut arglist,
                &Signature::empty(),
                CallFlags::ILECALL_EXCP_NOSIGNAL,
            )?
        };

        let mut bytes = [0u8; 4];
        self.copy_from_foreign(&SpacePointer::from_raw(cell), &mut bytes)?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// `errno` for diagnostics; failures are logged and swallowed
    pub fn errno_or_none(&self) -> Option<u32> {
        match self.foreign_errno() {
            Ok(errno) => Some(errno),
            Err(e) => {
                warn!(error = %e, "could not read ILE errno");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::BridgeError;
    use crate::ffi::caller::Bridge;
    use crate::testing::{FakePase, EXCEPTION_RC};

    #[test]
    fn test_errno_is_read_big_endian() {
        let sys = FakePase::new();
        sys.set_errno(0x0000_0BCD);
        let bridge = Bridge::new(sys);
        assert_eq!(bridge.foreign_errno().unwrap(), 0x0BCD);
    }

    #[test]
    fn test_errno_accessor_resolved_once() {
        let bridge = Bridge::new(FakePase::new());
        bridge.foreign_errno().unwrap();
        bridge.foreign_errno().unwrap();
        assert_eq!(bridge.primitives().calls("_ILESYMX"), 1);
        assert_eq!(bridge.primitives().calls("__errno"), 2);
    }

    #[test]
    fn test_errno_or_none_on_missing_accessor() {
        let sys = FakePase::new();
        sys.remove_object("QSYS/QC2UTIL1");
        let bridge = Bridge::new(sys);
        assert_eq!(bridge.errno_or_none(), None);
    }

    #[test]
    fn test_unreadable_errno_cell_is_an_error() {
        let sys = FakePase::new();
        sys.set_errno(3021);
        sys.fail_procedure("_MEMCPY_WT2", EXCEPTION_RC);
        let bridge = Bridge::new(sys);

        assert!(matches!(
            bridge.foreign_errno(),
            Err(BridgeError::Invocation { rc: EXCEPTION_RC, .. })
        ));
        assert_eq!(bridge.errno_or_none(), None);
    }
}
