//! Calling ILE procedures and programs from PASE
//!
//! [`Bridge`] owns the PASE primitives and the symbol registry. One bridge is
//! built at startup and passed by reference to every call site.
//!
//! Procedures are called through `_ILECALLX` with a typed argument list and a
//! signature; programs through `_PGMCALL` with a null-terminated vector of
//! argument addresses. A nonzero return from either primitive is reported as
//! [`BridgeError::Invocation`] and nowhere else.

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::arglist::{Arglist, ForeignValue};
use crate::ffi::loader::{ProgramHandle, SymbolCache, SymbolHandle};
use crate::ffi::pointer::{MemPointer, SpacePointer, TaggedPointer};
use crate::ffi::primitives::{PaseLibc, PasePrimitives};
use crate::ffi::types::{CallFlags, ResultType, Signature};
use std::ffi::c_void;
use std::os::raw::c_int;
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::trace;

/// PASE → ILE call bridge
pub struct Bridge<P: PasePrimitives = PaseLibc> {
    sys: P,
    cache: SymbolCache,
}

impl Bridge<PaseLibc> {
    /// Bridge over the PASE libc member at `path`
    pub fn open(path: &str) -> BridgeResult<Self> {
        Ok(Self::new(PaseLibc::open(path)?))
    }
}

impl<P: PasePrimitives> Bridge<P> {
    pub fn new(sys: P) -> Self {
        Self {
            sys,
            cache: SymbolCache::new(),
        }
    }

    pub fn primitives(&self) -> &P {
        &self.sys
    }

    pub fn cache(&self) -> &SymbolCache {
        &self.cache
    }

    /// Resolve (and cache) a procedure exported by `library/object`
    pub fn resolve(
        &self,
        library: &str,
        object: &str,
        symbol: &str,
    ) -> BridgeResult<Arc<SymbolHandle>> {
        self.cache.resolve(&self.sys, library, object, symbol)
    }

    /// Resolve (and cache) a program object
    pub fn resolve_program(&self, library: &str, program: &str) -> BridgeResult<Arc<ProgramHandle>> {
        self.cache.resolve_program(&self.sys, library, program)
    }

    /// Space pointer to local memory, for ILE code that dereferences it itself
    ///
    /// The pointer is only meaningful while `target` stays where it is.
    pub fn space_pointer<T: ?Sized>(&self, target: &T) -> BridgeResult<SpacePointer> {
        self.space_pointer_to(target as *const T as *const c_void)
    }

    /// Space pointer to local memory that ILE will write through
    pub fn space_pointer_mut<T: ?Sized>(&self, target: &mut T) -> BridgeResult<SpacePointer> {
        self.space_pointer_to(target as *mut T as *const c_void)
    }

    fn space_pointer_to(&self, addr: *const c_void) -> BridgeResult<SpacePointer> {
        let mut pointer = SpacePointer::NULL;
        unsafe {
            self.sys.set_space_pointer(pointer.raw_mut(), addr);
        }
        if pointer.is_null() {
            return Err(BridgeError::Protocol {
                target: "_SETSPP".to_string(),
                detail: "returned a null space pointer".to_string(),
            });
        }
        Ok(pointer)
    }

    /// PASE address designated by a space pointer, if it has one
    pub fn local_address(&self, pointer: &SpacePointer) -> Option<NonNull<c_void>> {
        NonNull::new(unsafe { self.sys.convert_space_pointer(pointer.as_ptr()) })
    }

    /// Copy `target.len()` bytes from ILE memory into `target`
    ///
    /// The copy goes through `_MEMCPY_WT2` on two space pointers, so it is bounded
    /// by the local buffer and never aliases the foreign memory.
    pub fn copy_from_foreign(&self, source: &SpacePointer, target: &mut [u8]) -> BridgeResult<()> {
        if target.is_empty() {
            return Ok(());
        }
        let len = target.len();
        let local = self.space_pointer_mut(&mut *target)?;
        let rc = unsafe { self.sys.copy_tagged(local.as_ptr(), source.as_ptr(), len) };
        if rc != 0 {
            return Err(BridgeError::Invocation {
                target: "_MEMCPY_WT2".to_string(),
                rc,
                flags: 0,
            });
        }
        Ok(())
    }

    /// Call an ILE procedure
    ///
    /// Scalar results are left in `arglist.base().result`; read them with the
    /// typed lanes of [`TaggedPointer`]. For aggregate results the caller must
    /// have pointed the result slot at local memory; prefer
    /// [`Bridge::invoke_aggregate`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - the fields of `arglist` match `signature` in order and size
    /// - every `MemPointer` in `arglist` designates live memory of the type the
    ///   procedure expects
    /// - the procedure's return type matches `result`
    pub unsafe fn invoke<A: Arglist>(
        &self,
        symbol: &SymbolHandle,
        arglist: &mut A,
        signature: &Signature,
        result: ResultType,
        flags: CallFlags,
    ) -> BridgeResult<()> {
        let result_code = result.code()?;
        if result.is_aggregate() && arglist.base().result.is_null() {
            return Err(BridgeError::InvalidSignature(format!(
                "{} returns an aggregate but the result slot has no target",
                symbol
            )));
        }

        trace!(callee = %symbol, %signature, result_code, flags = flags.bits(), "_ILECALLX");
        let rc = self.sys.call(
            symbol.pointer().as_ptr(),
            arglist as *mut A as *mut c_void,
            signature.as_ptr(),
            result_code,
            flags.bits() as c_int,
        );
        if rc != 0 {
            return Err(BridgeError::Invocation {
                target: symbol.to_string(),
                rc,
                flags: flags.bits(),
            });
        }
        Ok(())
    }

    /// Call an ILE procedure returning an aggregate of type `R`
    ///
    /// The result slot is pointed at a zeroed local `R` and the result size is
    /// declared as exactly `size_of::<R>()`, so ILE writes no more than that.
    ///
    /// # Safety
    ///
    /// Same requirements as [`Bridge::invoke`]; `R` must match the procedure's
    /// return type byte for byte.
    pub unsafe fn invoke_aggregate<A: Arglist, R: ForeignValue>(
        &self,
        symbol: &SymbolHandle,
        arglist: &mut A,
        signature: &Signature,
        flags: CallFlags,
    ) -> BridgeResult<R> {
        let mut value: R = std::mem::zeroed();
        arglist
            .base_mut()
            .set_result_target(MemPointer::to_mut(&mut value));

        let outcome = self.invoke(
            symbol,
            arglist,
            signature,
            ResultType::Aggregate(std::mem::size_of::<R>()),
            flags,
        );

        // The staging value is about to move; don't leave its address behind.
        arglist.base_mut().result = TaggedPointer::NULL;
        outcome.map(|()| value)
    }

    /// Call an ILE program with raw argument addresses
    ///
    /// # Safety
    ///
    /// Every address in `args` must designate live memory of the type and size the
    /// program expects for that parameter.
    pub unsafe fn call_program(
        &self,
        program: &ProgramHandle,
        args: &[*mut c_void],
        flags: CallFlags,
    ) -> BridgeResult<()> {
        let mut argv: Vec<*mut c_void> = Vec::with_capacity(args.len() + 1);
        argv.extend_from_slice(args);
        argv.push(std::ptr::null_mut());

        trace!(callee = %program, argc = args.len(), flags = flags.bits(), "_PGMCALL");
        let rc = self
            .sys
            .call_program(program.pointer().as_ptr(), argv.as_mut_ptr(), flags.bits());
        if rc != 0 {
            return Err(BridgeError::Invocation {
                target: program.to_string(),
                rc,
                flags: flags.bits(),
            });
        }
        Ok(())
    }

    /// Resolve everything the codepage workload calls, up front
    ///
    /// Returns the number of procedures and programs now cached.
    pub fn preload(&self) -> BridgeResult<usize> {
        for (library, object, symbol) in crate::iconv::PROCEDURES {
            self.resolve(library, object, symbol)?;
        }
        let (library, object, symbol) = crate::ffi::errno::ERRNO_PROCEDURE;
        self.resolve(library, object, symbol)?;

        let (library, program) = crate::probe::ENCODING_SCHEME_PROGRAM;
        self.resolve_program(library, program)?;

        Ok(self.cache.procedure_count() + self.cache.program_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::arglist::ArglistBase;
    use crate::testing::FakePase;

    #[test]
    fn test_space_pointer_round_trips_through_cvtspp() {
        let bridge = Bridge::new(FakePase::new());
        let value = [1u8, 2, 3, 4];
        let pointer = bridge.space_pointer(&value).unwrap();
        let addr = bridge.local_address(&pointer).unwrap();
        assert_eq!(addr.as_ptr() as usize, value.as_ptr() as usize);
    }

    #[test]
    fn test_aggregate_without_target_rejected() {
        let bridge = Bridge::new(FakePase::new());
        let symbol = bridge.resolve("QSYS", "QC2UTIL1", "__errno").unwrap();
        let mut arglist = ArglistBase::default();
        let result = unsafe {
            bridge.invoke(
                &symbol,
                &mut arglist,
                &Signature::empty(),
                ResultType::Aggregate(16),
                CallFlags::ILECALL_EXCP_NOSIGNAL,
            )
        };
        assert!(matches!(result, Err(BridgeError::InvalidSignature(_))));
    }

    #[test]
    fn test_preload_resolves_workload() {
        let bridge = Bridge::new(FakePase::new());
        assert_eq!(bridge.preload().unwrap(), 5);
        assert_eq!(bridge.cache().activation_count(), 2);
    }

    #[test]
    fn test_copy_from_foreign_empty_target() {
        let bridge = Bridge::new(FakePase::new());
        let mut empty: [u8; 0] = [];
        bridge
            .copy_from_foreign(&SpacePointer::NULL, &mut empty)
            .unwrap();
        assert_eq!(bridge.primitives().calls("_MEMCPY_WT2"), 0);
    }

    #[test]
    fn test_copy_from_unreadable_source_fails() {
        let bridge = Bridge::new(FakePase::new());
        let mut buffer = [0xAAu8; 4];
        let source = SpacePointer::from_raw(TaggedPointer::new(0x1234, 0));

        let result = bridge.copy_from_foreign(&source, &mut buffer);

        assert!(matches!(
            result,
            Err(BridgeError::Invocation { ref target, flags: 0, .. }) if target == "_MEMCPY_WT2"
        ));
        assert_eq!(buffer, [0xAA; 4]);
        assert_eq!(bridge.primitives().calls("_MEMCPY_WT2"), 1);
    }
}
