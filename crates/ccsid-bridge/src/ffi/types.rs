//! ILE call-convention codes
//!
//! Defines:
//! - `ArgType`: one entry of an `_ILECALLX` signature
//! - `ResultType`: the result-kind code passed to `_ILECALLX`
//! - `Signature`: an `ARG_END`-terminated list of argument codes
//! - `CallFlags`: `_ILECALLX` / `_PGMCALL` option bits
//!
//! Argument codes and result codes are separate negative-integer spaces. In both,
//! a positive value N means "aggregate of N bytes passed by value".

use crate::error::{BridgeError, BridgeResult};
use std::fmt;
use std::ops::BitOr;

pub const ARG_END: i16 = 0;
pub const ARG_INT8: i16 = -1;
pub const ARG_UINT8: i16 = -2;
pub const ARG_INT16: i16 = -3;
pub const ARG_UINT16: i16 = -4;
pub const ARG_INT32: i16 = -5;
pub const ARG_UINT32: i16 = -6;
pub const ARG_INT64: i16 = -7;
pub const ARG_UINT64: i16 = -8;
pub const ARG_FLOAT64: i16 = -10;
pub const ARG_MEMPTR: i16 = -11;
pub const ARG_SPCPTR: i16 = -12;

pub const RESULT_VOID: i16 = 0;
pub const RESULT_INT8: i16 = -1;
pub const RESULT_UINT8: i16 = -2;
pub const RESULT_INT16: i16 = -3;
pub const RESULT_UINT16: i16 = -4;
pub const RESULT_INT32: i16 = -5;
pub const RESULT_UINT32: i16 = -6;
pub const RESULT_INT64: i16 = -7;
pub const RESULT_UINT64: i16 = -8;
pub const RESULT_FLOAT64: i16 = -10;
pub const RESULT_FLOAT128: i16 = -18;

/// `_ILELOADX`: the name is a `LIBRARY/OBJECT` path
pub const ILELOAD_LIBOBJ: u32 = 0x0000_0001;
/// `_ILELOADX` failure mark
pub const ILELOAD_FAILED: u64 = u64::MAX;
/// `_ILESYMX`: the export is a procedure
pub const ILESYM_PROCEDURE: i32 = 1;

/// `_RSLOBJ2` object types
pub const RSLOBJ_TS_PGM: u16 = 0x0201;
pub const RSLOBJ_TS_SRVPGM: u16 = 0x0203;

/// One argument-passing convention in a call signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float64,
    /// PASE address, converted to a space pointer by `_ILECALLX`
    MemPtr,
    /// Space pointer already in ILE form
    SpcPtr,
    /// Aggregate of N bytes passed by value
    Aggregate(usize),
}

impl ArgType {
    /// Aggregate argument sized for `T`
    pub fn by_value<T>() -> Self {
        ArgType::Aggregate(std::mem::size_of::<T>())
    }

    /// Signature code for this argument
    pub fn code(&self) -> BridgeResult<i16> {
        Ok(match self {
            ArgType::Int8 => ARG_INT8,
            ArgType::UInt8 => ARG_UINT8,
            ArgType::Int16 => ARG_INT16,
            ArgType::UInt16 => ARG_UINT16,
            ArgType::Int32 => ARG_INT32,
            ArgType::UInt32 => ARG_UINT32,
            ArgType::Int64 => ARG_INT64,
            ArgType::UInt64 => ARG_UINT64,
            ArgType::Float64 => ARG_FLOAT64,
            ArgType::MemPtr => ARG_MEMPTR,
            ArgType::SpcPtr => ARG_SPCPTR,
            ArgType::Aggregate(size) => aggregate_code(*size)?,
        })
    }
}

/// Result kind of an ILE procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    Void,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float64,
    Float128,
    /// N-byte aggregate copied to the address in the result slot
    Aggregate(usize),
}

impl ResultType {
    pub fn code(&self) -> BridgeResult<i16> {
        Ok(match self {
            ResultType::Void => RESULT_VOID,
            ResultType::Int8 => RESULT_INT8,
            ResultType::UInt8 => RESULT_UINT8,
            ResultType::Int16 => RESULT_INT16,
            ResultType::UInt16 => RESULT_UINT16,
            ResultType::Int32 => RESULT_INT32,
            ResultType::UInt32 => RESULT_UINT32,
            ResultType::Int64 => RESULT_INT64,
            ResultType::UInt64 => RESULT_UINT64,
            ResultType::Float64 => RESULT_FLOAT64,
            ResultType::Float128 => RESULT_FLOAT128,
            ResultType::Aggregate(size) => aggregate_code(*size)?,
        })
    }

    /// Whether the result is written through the result slot's address
    pub fn is_aggregate(&self) -> bool {
        matches!(self, ResultType::Aggregate(_))
    }
}

fn aggregate_code(size: usize) -> BridgeResult<i16> {
    match i16::try_from(size) {
        Ok(code) if code > 0 => Ok(code),
        _ => Err(BridgeError::InvalidSignature(format!(
            "aggregate of {} bytes cannot be passed by value",
            size
        ))),
    }
}

/// `ARG_END`-terminated argument codes for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    args: Vec<ArgType>,
    codes: Vec<i16>,
}

impl Signature {
    pub fn new(args: &[ArgType]) -> BridgeResult<Self> {
        let mut codes = args
            .iter()
            .map(ArgType::code)
            .collect::<BridgeResult<Vec<_>>>()?;
        codes.push(ARG_END);
        Ok(Self {
            args: args.to_vec(),
            codes,
        })
    }

    /// Signature of a procedure without parameters
    pub fn empty() -> Self {
        Self {
            args: Vec::new(),
            codes: vec![ARG_END],
        }
    }

    pub fn args(&self) -> &[ArgType] {
        &self.args
    }

    /// Codes including the terminator
    pub fn codes(&self) -> &[i16] {
        &self.codes
    }

    pub fn as_ptr(&self) -> *const i16 {
        self.codes.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<String> = self.codes.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", codes.join(","))
    }
}

/// Option bits for `_ILECALLX` and `_PGMCALL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CallFlags(u32);

impl CallFlags {
    pub const NONE: CallFlags = CallFlags(0);

    pub const ILECALL_NOINTERRUPT: CallFlags = CallFlags(0x0000_0004);
    pub const ILECALL_EXCP_NOSIGNAL: CallFlags = CallFlags(0x0000_0020);

    pub const PGMCALL_DIRECT_ARGS: CallFlags = CallFlags(0x0000_0001);
    pub const PGMCALL_DROP_ADOPT: CallFlags = CallFlags(0x0000_0002);
    pub const PGMCALL_NOINTERRUPT: CallFlags = CallFlags(0x0000_0004);
    pub const PGMCALL_NOMAXARGS: CallFlags = CallFlags(0x0000_0008);
    pub const PGMCALL_ASCII_STRINGS: CallFlags = CallFlags(0x0000_0010);
    pub const PGMCALL_EXCP_NOSIGNAL: CallFlags = CallFlags(0x0000_0020);

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: CallFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CallFlags {
    type Output = CallFlags;

    fn bitor(self, rhs: CallFlags) -> CallFlags {
        CallFlags(self.0 | rhs.0)
    }
}

impl fmt::LowerHex for CallFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_end_terminated() {
        let sig = Signature::new(&[ArgType::MemPtr, ArgType::MemPtr]).unwrap();
        assert_eq!(sig.codes(), &[ARG_MEMPTR, ARG_MEMPTR, ARG_END]);
        assert_eq!(sig.len(), 2);
    }

    #[test]
    fn test_empty_signature() {
        let sig = Signature::empty();
        assert_eq!(sig.codes(), &[ARG_END]);
        assert!(sig.is_empty());
    }

    #[test]
    fn test_aggregate_codes_are_positive_sizes() {
        assert_eq!(ArgType::Aggregate(52).code().unwrap(), 52);
        assert_eq!(ResultType::Aggregate(16).code().unwrap(), 16);
    }

    #[test]
    fn test_oversized_aggregate_rejected() {
        let result = Signature::new(&[ArgType::Aggregate(70_000)]);
        assert!(matches!(result, Err(BridgeError::InvalidSignature(_))));
        assert!(ArgType::Aggregate(0).code().is_err());
    }

    #[test]
    fn test_flags_combine() {
        let flags = CallFlags::ILECALL_NOINTERRUPT | CallFlags::ILECALL_EXCP_NOSIGNAL;
        assert_eq!(flags.bits(), 0x24);
        assert!(flags.contains(CallFlags::ILECALL_EXCP_NOSIGNAL));
        assert!(!CallFlags::NONE.contains(CallFlags::ILECALL_NOINTERRUPT));
    }

    #[test]
    fn test_signature_display() {
        let sig = Signature::new(&[ArgType::Aggregate(52), ArgType::MemPtr]).unwrap();
        assert_eq!(sig.to_string(), "[52,-11,0]");
    }
}
