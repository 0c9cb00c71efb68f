//! ILE object loading and symbol resolution
//!
//! Loading an ILE object through `_ILELOADX` attaches an activation group that
//! lives until the process exits, so activation marks, procedure handles and
//! program handles are resolved once and kept. Failed resolutions are not
//! remembered; the next request tries again.

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::pointer::SpacePointer;
use crate::ffi::primitives::PasePrimitives;
use crate::ffi::types::{ILELOAD_FAILED, ILELOAD_LIBOBJ, ILESYM_PROCEDURE, RSLOBJ_TS_PGM};
use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Resolved ILE procedure
#[derive(Debug, PartialEq, Eq)]
pub struct SymbolHandle {
    pointer: SpacePointer,
    library: String,
    object: String,
    symbol: String,
}

impl SymbolHandle {
    pub fn pointer(&self) -> &SpacePointer {
        &self.pointer
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl fmt::Display for SymbolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}({})", self.library, self.object, self.symbol)
    }
}

/// Resolved ILE program
#[derive(Debug, PartialEq, Eq)]
pub struct ProgramHandle {
    pointer: SpacePointer,
    library: String,
    program: String,
}

impl ProgramHandle {
    pub fn pointer(&self) -> &SpacePointer {
        &self.pointer
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl fmt::Display for ProgramHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.library, self.program)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SymbolKey {
    library: String,
    object: String,
    symbol: String,
}

/// Registry of activation marks and resolved handles
///
/// Each map sits behind its own lock, held across the foreign resolution so
/// that concurrent first use resolves a name exactly once. Locks are always
/// taken in the order procedures → activations.
#[derive(Default)]
pub struct SymbolCache {
    activations: Mutex<HashMap<String, u64>>,
    procedures: Mutex<HashMap<SymbolKey, Arc<SymbolHandle>>>,
    programs: Mutex<HashMap<(String, String), Arc<ProgramHandle>>>,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a procedure exported by `library/object`
    pub fn resolve<P: PasePrimitives>(
        &self,
        sys: &P,
        library: &str,
        object: &str,
        symbol: &str,
    ) -> BridgeResult<Arc<SymbolHandle>> {
        let key = SymbolKey {
            library: library.to_string(),
            object: object.to_string(),
            symbol: symbol.to_string(),
        };

        let mut procedures = lock(&self.procedures);
        if let Some(handle) = procedures.get(&key) {
            trace!(%handle, "symbol cache hit");
            return Ok(Arc::clone(handle));
        }

        let mark = self.activate(sys, library, object)?;
        let name = c_name(symbol)?;

        let mut pointer = SpacePointer::NULL;
        let kind = unsafe { sys.resolve_symbol(pointer.raw_mut(), mark, &name) };
        if kind != ILESYM_PROCEDURE {
            return Err(BridgeError::SymbolNotFound {
                object: object_path(library, object),
                symbol: symbol.to_string(),
            });
        }

        let handle = Arc::new(SymbolHandle {
            pointer,
            library: key.library.clone(),
            object: key.object.clone(),
            symbol: key.symbol.clone(),
        });
        debug!(%handle, pointer = %handle.pointer, "resolved procedure");
        procedures.insert(key, Arc::clone(&handle));
        Ok(handle)
    }

    /// Resolve a program object `library/program`
    pub fn resolve_program<P: PasePrimitives>(
        &self,
        sys: &P,
        library: &str,
        program: &str,
    ) -> BridgeResult<Arc<ProgramHandle>> {
        let key = (library.to_string(), program.to_string());

        let mut programs = lock(&self.programs);
        if let Some(handle) = programs.get(&key) {
            trace!(%handle, "program cache hit");
            return Ok(Arc::clone(handle));
        }

        let c_program = c_name(program)?;
        let c_library = c_name(library)?;

        let mut pointer = SpacePointer::NULL;
        let rc = unsafe {
            sys.resolve_object(pointer.raw_mut(), RSLOBJ_TS_PGM, &c_program, &c_library)
        };
        if rc != 0 {
            return Err(BridgeError::ProgramNotFound {
                library: library.to_string(),
                program: program.to_string(),
                rc,
            });
        }

        let handle = Arc::new(ProgramHandle {
            pointer,
            library: key.0.clone(),
            program: key.1.clone(),
        });
        debug!(%handle, pointer = %handle.pointer, "resolved program");
        programs.insert(key, Arc::clone(&handle));
        Ok(handle)
    }

    /// Activation mark of `library/object`, loading it on first use
    fn activate<P: PasePrimitives>(&self, sys: &P, library: &str, object: &str) -> BridgeResult<u64> {
        let path = object_path(library, object);

        let mut activations = lock(&self.activations);
        if let Some(mark) = activations.get(&path) {
            return Ok(*mark);
        }

        let c_path = c_name(&path)?;
        let mark = unsafe { sys.load_object(&c_path, ILELOAD_LIBOBJ) };
        if mark == ILELOAD_FAILED {
            return Err(BridgeError::ObjectNotFound { object: path });
        }

        debug!(object = %path, mark = format_args!("{:#x}", mark), "activated ILE object");
        activations.insert(path, mark);
        Ok(mark)
    }

    /// Number of activated objects
    pub fn activation_count(&self) -> usize {
        lock(&self.activations).len()
    }

    /// Number of cached procedures
    pub fn procedure_count(&self) -> usize {
        lock(&self.procedures).len()
    }

    /// Number of cached programs
    pub fn program_count(&self) -> usize {
        lock(&self.programs).len()
    }
}

fn object_path(library: &str, object: &str) -> String {
    format!("{}/{}", library, object)
}

fn c_name(name: &str) -> BridgeResult<CString> {
    CString::new(name).map_err(|_| BridgeError::InvalidName(name.to_string()))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePase;

    #[test]
    fn test_object_not_found() {
        let sys = FakePase::new();
        let cache = SymbolCache::new();
        let result = cache.resolve(&sys, "QSYS", "NOSUCHOBJ", "iconv");
        assert!(matches!(result, Err(BridgeError::ObjectNotFound { .. })));
        assert_eq!(cache.activation_count(), 0);
    }

    #[test]
    fn test_symbol_not_found_keeps_activation() {
        let sys = FakePase::new();
        let cache = SymbolCache::new();
        let result = cache.resolve(&sys, "QSYS", "QTQICONV", "no_such_proc");
        assert!(matches!(result, Err(BridgeError::SymbolNotFound { .. })));
        assert_eq!(cache.activation_count(), 1);
        assert_eq!(cache.procedure_count(), 0);
    }

    #[test]
    fn test_name_with_nul_rejected() {
        let sys = FakePase::new();
        let cache = SymbolCache::new();
        let result = cache.resolve(&sys, "QSYS", "QTQICONV", "ic\0onv");
        assert!(matches!(result, Err(BridgeError::InvalidName(_))));
    }

    #[test]
    fn test_cache_starts_empty() {
        let cache = SymbolCache::new();
        assert_eq!(cache.activation_count(), 0);
        assert_eq!(cache.procedure_count(), 0);
        assert_eq!(cache.program_count(), 0);
    }

    #[test]
    fn test_handle_display() {
        let sys = FakePase::new();
        let cache = SymbolCache::new();
        let handle = cache.resolve(&sys, "QSYS", "QTQICONV", "iconv").unwrap();
        assert_eq!(handle.to_string(), "QSYS/QTQICONV(iconv)");
        assert!(!handle.pointer().is_null());
    }
}
