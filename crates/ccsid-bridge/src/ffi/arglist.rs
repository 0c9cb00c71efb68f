//! `_ILECALLX` argument lists
//!
//! Every argument list starts with [`ArglistBase`]: a descriptor slot reserved for
//! ILE, then the result slot. Call-specific fields follow in signature order.
//! Argument lists are `repr(C, align(16))` so that embedded tagged pointers land on
//! 16-byte boundaries.

use crate::ffi::pointer::{MemPointer, TaggedPointer};

/// Fixed argument-list header
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArglistBase {
    pub descriptor: TaggedPointer,
    /// Scalar results land here; aggregate results go to the address in `lo`
    pub result: TaggedPointer,
}

const _: () = {
    assert!(std::mem::size_of::<ArglistBase>() == 32);
    assert!(std::mem::offset_of!(ArglistBase, descriptor) == 0);
    assert!(std::mem::offset_of!(ArglistBase, result) == 16);
};

impl ArglistBase {
    /// Direct an aggregate result to local memory
    pub fn set_result_target(&mut self, target: MemPointer) {
        self.result = target.raw();
    }
}

/// A `#[repr(C, align(16))]` struct whose first field is an [`ArglistBase`]
///
/// # Safety
///
/// Implementors must guarantee:
/// - the struct is `#[repr(C)]` with `align(16)`
/// - its first field is an `ArglistBase`
/// - the remaining fields match the signature it is called with, in order
pub unsafe trait Arglist: Sized {
    fn base(&self) -> &ArglistBase;
    fn base_mut(&mut self) -> &mut ArglistBase;
}

unsafe impl Arglist for ArglistBase {
    fn base(&self) -> &ArglistBase {
        self
    }

    fn base_mut(&mut self) -> &mut ArglistBase {
        self
    }
}

/// Plain-old-data value that may be filled byte-for-byte by ILE
///
/// # Safety
///
/// Every bit pattern, including all zeroes, must be a valid value of the type.
pub unsafe trait ForeignValue: Copy {}

unsafe impl ForeignValue for TaggedPointer {}
unsafe impl ForeignValue for i32 {}
unsafe impl ForeignValue for u32 {}
unsafe impl ForeignValue for i64 {}
unsafe impl ForeignValue for u64 {}
unsafe impl<const N: usize> ForeignValue for [u8; N] {}
unsafe impl<const N: usize> ForeignValue for [i32; N] {}
