//! PASE → ILE foreign function interface
//!
//! This module provides the low-level machinery for calling ILE procedures and
//! programs from a PASE process:
//! - [`pointer`]: 128-bit tagged pointers and their PASE-side forms
//! - [`types`]: argument, result and flag codes of the call conventions
//! - [`arglist`]: argument-list layout shared by every procedure call
//! - [`primitives`]: the libc entry points, behind the [`PasePrimitives`] seam
//! - [`loader`]: activation and symbol resolution with a process-lifetime cache
//! - [`caller`]: the [`Bridge`] that performs calls
//! - [`errno`]: reading the ILE `errno`

pub mod arglist;
pub mod caller;
pub mod errno;
pub mod loader;
pub mod pointer;
pub mod primitives;
pub mod types;

pub use arglist::{Arglist, ArglistBase, ForeignValue};
pub use caller::Bridge;
pub use errno::ERRNO_PROCEDURE;
pub use loader::{ProgramHandle, SymbolCache, SymbolHandle};
pub use pointer::{MemPointer, SpacePointer, TaggedPointer};
pub use primitives::{PaseLibc, PasePrimitives, DEFAULT_LIBC_PATH};
pub use types::{ArgType, CallFlags, ResultType, Signature};
