//! 128-bit tagged pointers shared between PASE and ILE
//!
//! ILE addresses memory through 16-byte tagged pointers. PASE code meets them
//! in two forms:
//! - [`MemPointer`]: a flat PASE address in the low lane with a zero high lane.
//!   ILE accepts this form for `ARG_MEMPTR` arguments and for the address of an
//!   aggregate result. It is the only form whose address may be read locally.
//! - [`SpacePointer`]: a pointer ILE understands natively, produced by `_SETSPP`
//!   or handed back from an ILE procedure. It is opaque on the PASE side and may
//!   only be read through `_CVTSPP` or `_MEMCPY_WT2`.
//!
//! All three types are plain values; none of them owns the memory it designates.

use std::fmt;

/// Raw two-lane ILE pointer
#[repr(C, align(16))]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TaggedPointer {
    pub hi: u64,
    pub lo: u64,
}

const _: () = assert!(std::mem::size_of::<TaggedPointer>() == 16);
const _: () = assert!(std::mem::align_of::<TaggedPointer>() == 16);

impl TaggedPointer {
    pub const NULL: TaggedPointer = TaggedPointer { hi: 0, lo: 0 };

    pub const fn new(hi: u64, lo: u64) -> Self {
        Self { hi, lo }
    }

    pub fn is_null(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    /// Raw bytes in memory order
    pub fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.hi.to_ne_bytes());
        out[8..].copy_from_slice(&self.lo.to_ne_bytes());
        out
    }

    /// Signed 32-bit value stored at the start of the slot
    pub fn int32(&self) -> i32 {
        let b = self.hi.to_ne_bytes();
        i32::from_ne_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Unsigned 32-bit value stored at the start of the slot
    pub fn uint32(&self) -> u32 {
        self.int32() as u32
    }

    /// Signed 64-bit value stored at the start of the slot
    pub fn int64(&self) -> i64 {
        self.hi as i64
    }

    /// Unsigned 64-bit value stored at the start of the slot
    pub fn uint64(&self) -> u64 {
        self.hi
    }
}

impl fmt::Display for TaggedPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

impl fmt::Debug for TaggedPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaggedPointer({})", self)
    }
}

/// Flat PASE address in ILE pointer clothing
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct MemPointer(TaggedPointer);

impl MemPointer {
    pub const NULL: MemPointer = MemPointer(TaggedPointer::NULL);

    pub fn from_addr(addr: usize) -> Self {
        Self(TaggedPointer::new(0, addr as u64))
    }

    /// Point at a local value
    pub fn to<T>(value: &T) -> Self {
        Self::from_addr(value as *const T as usize)
    }

    /// Point at a mutable local value
    pub fn to_mut<T>(value: &mut T) -> Self {
        Self::from_addr(value as *mut T as usize)
    }

    pub fn addr(&self) -> usize {
        self.0.lo as usize
    }

    pub fn raw(&self) -> TaggedPointer {
        self.0
    }
}

/// ILE-native pointer; never dereferenced as a flat address
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct SpacePointer(TaggedPointer);

impl SpacePointer {
    pub const NULL: SpacePointer = SpacePointer(TaggedPointer::NULL);

    /// Wrap a value received from ILE or from a PASE primitive
    pub fn from_raw(raw: TaggedPointer) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> TaggedPointer {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Address of the pointer itself, for primitives that read it in place
    pub fn as_ptr(&self) -> *const TaggedPointer {
        &self.0
    }

    pub(crate) fn raw_mut(&mut self) -> &mut TaggedPointer {
        &mut self.0
    }
}

impl fmt::Display for SpacePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_32_hex_digits() {
        let ptr = TaggedPointer::new(0x8000_0000_0000_0000, 0x1234);
        assert_eq!(ptr.to_string(), "80000000000000000000000000001234");
    }

    #[test]
    fn test_mem_pointer_keeps_address_in_low_lane() {
        let value = 7u32;
        let ptr = MemPointer::to(&value);
        assert_eq!(ptr.raw().hi, 0);
        assert_eq!(ptr.addr(), &value as *const u32 as usize);
    }

    #[test]
    fn test_null_pointers() {
        assert!(TaggedPointer::NULL.is_null());
        assert!(SpacePointer::NULL.is_null());
        assert!(!TaggedPointer::new(1, 0).is_null());
    }

    #[test]
    fn test_scalar_lanes_read_leading_bytes() {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&(-5i32).to_ne_bytes());
        let slot = TaggedPointer::new(u64::from_ne_bytes(bytes), 0);
        assert_eq!(slot.int32(), -5);
        assert_eq!(slot.uint32(), (-5i32) as u32);
    }
}
