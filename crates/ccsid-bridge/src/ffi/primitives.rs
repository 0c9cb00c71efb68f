//! PASE libc primitives for reaching into ILE
//!
//! PASE exports the ILE interop entry points from the `shr_64.o` member of its
//! libc archive. They are loaded at runtime with `libloading` so that the crate
//! builds and tests on any host; [`PasePrimitives`] is the seam that lets the
//! simulated environment in [`crate::testing`] stand in for the real one.

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::pointer::TaggedPointer;
use libloading::Library;
use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int, c_uint};
use tracing::debug;

/// Default location of the PASE libc member exporting the primitives
pub const DEFAULT_LIBC_PATH: &str = "/QOpenSys/usr/lib/libc.a(shr_64.o)";

/// `dlopen` flag selecting an archive member (AIX/PASE)
pub const RTLD_MEMBER: c_int = 0x0004_0000;

/// The ILE interop primitives of PASE libc
///
/// Method names describe the primitive; the libc symbol is noted on each.
///
/// # Safety
///
/// All pointer arguments must be valid for the access the primitive performs.
/// Tagged pointers must be 16-byte aligned.
pub trait PasePrimitives {
    /// `_SETSPP`: build a space pointer to a PASE address
    unsafe fn set_space_pointer(&self, target: *mut TaggedPointer, addr: *const c_void) -> c_int;

    /// `_CVTSPP`: PASE address designated by a space pointer (null if none)
    unsafe fn convert_space_pointer(&self, pointer: *const TaggedPointer) -> *mut c_void;

    /// `_ILELOADX`: load an ILE object, returning its activation mark
    unsafe fn load_object(&self, path: &CStr, flags: u32) -> u64;

    /// `_ILESYMX`: look up an export of an activation
    unsafe fn resolve_symbol(&self, target: *mut TaggedPointer, mark: u64, name: &CStr)
        -> c_int;

    /// `_ILECALLX`: call an ILE procedure
    unsafe fn call(
        &self,
        target: *const TaggedPointer,
        arglist: *mut c_void,
        signature: *const i16,
        result_type: i16,
        flags: c_int,
    ) -> c_int;

    /// `_RSLOBJ2`: resolve a system object by type, name and library
    unsafe fn resolve_object(
        &self,
        target: *mut TaggedPointer,
        object_type: u16,
        name: &CStr,
        library: &CStr,
    ) -> c_int;

    /// `_PGMCALL`: call an ILE program with a null-terminated argument vector
    unsafe fn call_program(
        &self,
        target: *const TaggedPointer,
        argv: *mut *mut c_void,
        flags: u32,
    ) -> c_int;

    /// `_MEMCPY_WT2`: copy through two space pointers, preserving tags
    unsafe fn copy_tagged(
        &self,
        target: *const TaggedPointer,
        source: *const TaggedPointer,
        len: usize,
    ) -> c_int;
}

type SetSppFn = unsafe extern "C" fn(*mut TaggedPointer, *const c_void) -> c_int;
type CvtSppFn = unsafe extern "C" fn(*const TaggedPointer) -> *mut c_void;
type IleLoadxFn = unsafe extern "C" fn(*const c_char, c_uint) -> u64;
type IleSymxFn = unsafe extern "C" fn(*mut TaggedPointer, u64, *const c_char) -> c_int;
type IleCallxFn =
    unsafe extern "C" fn(*const TaggedPointer, *mut c_void, *const i16, i16, c_int) -> c_int;
type RslObj2Fn =
    unsafe extern "C" fn(*mut TaggedPointer, u16, *const c_char, *const c_char) -> c_int;
type PgmCallFn = unsafe extern "C" fn(*const TaggedPointer, *mut *mut c_void, c_uint) -> c_int;
type MemcpyWt2Fn =
    unsafe extern "C" fn(*const TaggedPointer, *const TaggedPointer, usize) -> c_int;

/// The primitives as exported by PASE libc
pub struct PaseLibc {
    setspp: SetSppFn,
    cvtspp: CvtSppFn,
    ileloadx: IleLoadxFn,
    ilesymx: IleSymxFn,
    ilecallx: IleCallxFn,
    rslobj2: RslObj2Fn,
    pgmcall: PgmCallFn,
    memcpy_wt2: MemcpyWt2Fn,
    /// Keeps the entry points above mapped
    _library: Library,
}

impl PaseLibc {
    /// Load the primitives from the default libc member
    pub fn load() -> BridgeResult<Self> {
        Self::open(DEFAULT_LIBC_PATH)
    }

    /// Load the primitives from a libc archive member such as
    /// `/QOpenSys/usr/lib/libc.a(shr_64.o)`
    pub fn open(path: &str) -> BridgeResult<Self> {
        let library = open_library(path)?;

        // Safety: the types above mirror the PASE prototypes in as400_protos.h
        let libc = unsafe {
            Self {
                setspp: entry(&library, path, "_SETSPP")?,
                cvtspp: entry(&library, path, "_CVTSPP")?,
                ileloadx: entry(&library, path, "_ILELOADX")?,
                ilesymx: entry(&library, path, "_ILESYMX")?,
                ilecallx: entry(&library, path, "_ILECALLX")?,
                rslobj2: entry(&library, path, "_RSLOBJ2")?,
                pgmcall: entry(&library, path, "_PGMCALL")?,
                memcpy_wt2: entry(&library, path, "_MEMCPY_WT2")?,
                _library: library,
            }
        };

        debug!(path, "loaded PASE primitives");
        Ok(libc)
    }
}

#[cfg(target_os = "aix")]
fn open_library(path: &str) -> BridgeResult<Library> {
    use libloading::os::unix;

    unsafe { unix::Library::open(Some(path), unix::RTLD_NOW | RTLD_MEMBER) }
        .map(Library::from)
        .map_err(|e| BridgeError::RuntimeUnavailable {
            path: path.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(all(unix, not(target_os = "aix")))]
fn open_library(path: &str) -> BridgeResult<Library> {
    use libloading::os::unix;

    unsafe { unix::Library::open(Some(path), unix::RTLD_NOW) }
        .map(Library::from)
        .map_err(|e| BridgeError::RuntimeUnavailable {
            path: path.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(not(unix))]
fn open_library(path: &str) -> BridgeResult<Library> {
    Err(BridgeError::RuntimeUnavailable {
        path: path.to_string(),
        reason: "PASE primitives require a Unix host".to_string(),
    })
}

/// Copy an entry point out of the library
///
/// # Safety
///
/// `T` must be the function-pointer type of the named export.
unsafe fn entry<T: Copy>(library: &Library, path: &str, name: &str) -> BridgeResult<T> {
    library
        .get::<T>(name.as_bytes())
        .map(|symbol| *symbol)
        .map_err(|e| BridgeError::RuntimeUnavailable {
            path: path.to_string(),
            reason: format!("missing {}: {}", name, e),
        })
}

impl PasePrimitives for PaseLibc {
    unsafe fn set_space_pointer(&self, target: *mut TaggedPointer, addr: *const c_void) -> c_int {
        (self.setspp)(target, addr)
    }

    unsafe fn convert_space_pointer(&self, pointer: *const TaggedPointer) -> *mut c_void {
        (self.cvtspp)(pointer)
    }

    unsafe fn load_object(&self, path: &CStr, flags: u32) -> u64 {
        (self.ileloadx)(path.as_ptr(), flags)
    }

    unsafe fn resolve_symbol(
        &self,
        target: *mut TaggedPointer,
        mark: u64,
        name: &CStr,
    ) -> c_int {
        (self.ilesymx)(target, mark, name.as_ptr())
    }

    unsafe fn call(
        &self,
        target: *const TaggedPointer,
        arglist: *mut c_void,
        signature: *const i16,
        result_type: i16,
        flags: c_int,
    ) -> c_int {
        (self.ilecallx)(target, arglist, signature, result_type, flags)
    }

    unsafe fn resolve_object(
        &self,
        target: *mut TaggedPointer,
        object_type: u16,
        name: &CStr,
        library: &CStr,
    ) -> c_int {
        (self.rslobj2)(target, object_type, name.as_ptr(), library.as_ptr())
    }

    unsafe fn call_program(
        &self,
        target: *const TaggedPointer,
        argv: *mut *mut c_void,
        flags: u32,
    ) -> c_int {
        (self.pgmcall)(target, argv, flags)
    }

    unsafe fn copy_tagged(
        &self,
        target: *const TaggedPointer,
        source: *const TaggedPointer,
        len: usize,
    ) -> c_int {
        (self.memcpy_wt2)(target, source, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_runtime_reports_path() {
        let result = PaseLibc::open("/nonexistent/libc.a(shr_64.o)");
        match result {
            Err(BridgeError::RuntimeUnavailable { path, .. }) => {
                assert_eq!(path, "/nonexistent/libc.a(shr_64.o)");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected load failure"),
        }
    }
}
