//! In-process stand-in for the ILE side of PASE
//!
//! [`FakePase`] implements [`PasePrimitives`] without an IBM i host. It knows
//! the objects the codepage workload uses (`QTQICONV`, `QC2UTIL1`, `QTQGESP`)
//! and a handful of CCSIDs, and it checks argument lists, signatures and
//! result codes the way the real procedures would read them. Every primitive
//! and simulated procedure is counted so tests can assert on caching.
//!
//! Space pointers produced by the fake carry a private tag in the high lane
//! and the PASE address in the low lane.

use crate::ffi::arglist::ArglistBase;
use crate::ffi::pointer::TaggedPointer;
use crate::ffi::primitives::PasePrimitives;
use crate::ffi::types::{
    ARG_END, ARG_MEMPTR, ILELOAD_FAILED, ILELOAD_LIBOBJ, ILESYM_PROCEDURE, RESULT_INT32,
    RESULT_UINT32, RSLOBJ_TS_PGM,
};
use crate::iconv::layout::{IconvArglist, IconvCloseArglist, IconvOpenArglist, IconvT, QtqCode};
use crate::iconv::UTF16_CCSID;
use crate::probe::{SCHEME_EBCDIC_DBCS, SCHEME_EBCDIC_SBCS};
use std::collections::{HashMap, HashSet};
use std::ffi::{c_void, CStr};
use std::os::raw::c_int;
use std::sync::{Mutex, MutexGuard};

const SPACE_TAG: u64 = 0x8000_0000_5350_0000;
const PROCEDURE_TAG: u64 = 0x8000_0000_5052_0000;
const PROGRAM_TAG: u64 = 0x8000_0000_5047_0000;
const ERRNO_TAG: u64 = 0x8000_0000_4552_0000;

/// Return code of a simulated call that raised an exception
pub const EXCEPTION_RC: c_int = -1;

/// errno set when a converter cannot be opened
pub const OPEN_ERRNO: u32 = 3021;
/// errno set for an unknown descriptor
pub const BAD_DESCRIPTOR_ERRNO: u32 = 3450;
/// errno set for an unmapped codepoint
pub const CONVERSION_ERRNO: u32 = 3492;

/// How a simulated CCSID behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeCcsid {
    /// EBCDIC single-byte: controls, letters, digits and common punctuation
    SingleByte,
    /// EBCDIC double-byte with a small mapped region
    DoubleByte,
    /// Classifies as single-byte but no converter can be opened
    Unconvertible,
    /// Reports the given encoding scheme
    Scheme(i32),
    /// `QTQGESP` raises an exception for it
    ProgramFailure,
}

struct State {
    /// Object path → activation mark
    objects: HashMap<String, u64>,
    /// Object path → exported procedures
    exports: HashMap<String, Vec<String>>,
    programs: HashSet<(String, String)>,
    /// Resolved procedure names, indexed by pointer low lane - 1
    procedures: Vec<String>,
    next_mark: u64,
    ccsids: HashMap<u32, FakeCcsid>,
    /// Open descriptor id → source CCSID
    descriptors: HashMap<i32, u32>,
    next_descriptor: i32,
    closed: usize,
    errno: u32,
    calls: HashMap<String, usize>,
    last_flags: HashMap<String, u32>,
    failures: HashMap<String, c_int>,
}

impl State {
    fn count(&mut self, name: &str) {
        *self.calls.entry(name.to_string()).or_insert(0) += 1;
    }

    fn add_object(&mut self, path: &str, exports: &[&str]) {
        self.next_mark += 0x10;
        self.objects.insert(path.to_string(), self.next_mark);
        self.exports.insert(
            path.to_string(),
            exports.iter().map(|e| e.to_string()).collect(),
        );
    }

    fn object_of_mark(&self, mark: u64) -> Option<&str> {
        self.objects
            .iter()
            .find(|(_, m)| **m == mark)
            .map(|(path, _)| path.as_str())
    }
}

/// Simulated PASE primitives and ILE objects
pub struct FakePase {
    state: Mutex<State>,
}

impl Default for FakePase {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePase {
    /// Environment with the standard objects and CCSIDs 37, 500 (single-byte),
    /// 300, 16684 (double-byte), 290 (unconvertible) and 1200 (UTF-16)
    pub fn new() -> Self {
        let mut state = State {
            objects: HashMap::new(),
            exports: HashMap::new(),
            programs: HashSet::new(),
            procedures: Vec::new(),
            next_mark: 0x1000,
            ccsids: HashMap::new(),
            descriptors: HashMap::new(),
            next_descriptor: 1,
            closed: 0,
            errno: 0,
            calls: HashMap::new(),
            last_flags: HashMap::new(),
            failures: HashMap::new(),
        };
        state.add_object("QSYS/QTQICONV", &["QtqIconvOpen", "iconv", "iconv_close"]);
        state.add_object("QSYS/QC2UTIL1", &["__errno"]);
        state
            .programs
            .insert(("QSYS".to_string(), "QTQGESP".to_string()));

        for (ccsid, kind) in [
            (37, FakeCcsid::SingleByte),
            (500, FakeCcsid::SingleByte),
            (290, FakeCcsid::Unconvertible),
            (300, FakeCcsid::DoubleByte),
            (16684, FakeCcsid::DoubleByte),
            (UTF16_CCSID, FakeCcsid::Scheme(0x7200)),
        ] {
            state.ccsids.insert(ccsid, kind);
        }

        Self {
            state: Mutex::new(state),
        }
    }

    /// Add or replace a simulated CCSID
    pub fn with_ccsid(self, ccsid: u32, kind: FakeCcsid) -> Self {
        self.set_ccsid(ccsid, kind);
        self
    }

    pub fn set_ccsid(&self, ccsid: u32, kind: FakeCcsid) {
        self.lock().ccsids.insert(ccsid, kind);
    }

    /// Known CCSIDs in increasing order
    pub fn ccsids(&self) -> Vec<u32> {
        let mut ccsids: Vec<u32> = self.lock().ccsids.keys().copied().collect();
        ccsids.sort_unstable();
        ccsids
    }

    /// Make `LIB/OBJ` loadable with the given exports
    pub fn add_object(&self, path: &str, exports: &[&str]) {
        self.lock().add_object(path, exports);
    }

    /// Make `LIB/OBJ` fail to load
    pub fn remove_object(&self, path: &str) {
        let mut state = self.lock();
        state.objects.remove(path);
        state.exports.remove(path);
    }

    pub fn remove_program(&self, library: &str, program: &str) {
        self.lock()
            .programs
            .remove(&(library.to_string(), program.to_string()));
    }

    /// Make every call to a procedure, program or `_MEMCPY_WT2` return `rc`
    pub fn fail_procedure(&self, name: &str, rc: c_int) {
        self.lock().failures.insert(name.to_string(), rc);
    }

    pub fn set_errno(&self, errno: u32) {
        self.lock().errno = errno;
    }

    pub fn errno(&self) -> u32 {
        self.lock().errno
    }

    /// Number of calls to a primitive (`_ILELOADX`), procedure (`iconv`) or
    /// program (`QTQGESP`)
    pub fn calls(&self, name: &str) -> usize {
        self.lock().calls.get(name).copied().unwrap_or(0)
    }

    /// Flags of the most recent call to a procedure or program
    pub fn last_flags(&self, name: &str) -> Option<u32> {
        self.lock().last_flags.get(name).copied()
    }

    /// Descriptors opened and not yet closed
    pub fn open_descriptors(&self) -> usize {
        self.lock().descriptors.len()
    }

    pub fn closed_descriptors(&self) -> usize {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// UTF-16 output of a single-byte codepoint
pub fn single_byte_char(byte: u8) -> Option<char> {
    let c = match byte {
        0x00..=0x03 => char::from(byte),
        0x05 => '\t',
        0x0D => '\r',
        0x15 => '\u{85}',
        0x25 => '\n',
        0x40 => ' ',
        0x41 => '\u{a0}',
        0x4A => '¢',
        0x4B => '.',
        0x4C => '<',
        0x4D => '(',
        0x4E => '+',
        0x4F => '|',
        0x50 => '&',
        0x5A => '!',
        0x5B => '$',
        0x5C => '*',
        0x5D => ')',
        0x5E => ';',
        0x5F => '¬',
        0x60 => '-',
        0x61 => '/',
        0x6B => ',',
        0x6C => '%',
        0x6D => '_',
        0x6E => '>',
        0x6F => '?',
        0x7A => ':',
        0x7B => '#',
        0x7C => '@',
        0x7D => '\'',
        0x7E => '=',
        0x7F => '"',
        0x81..=0x89 => offset('a', byte - 0x81),
        0x91..=0x99 => offset('j', byte - 0x91),
        0xA2..=0xA9 => offset('s', byte - 0xA2),
        0xC1..=0xC9 => offset('A', byte - 0xC1),
        0xD1..=0xD9 => offset('J', byte - 0xD1),
        0xE2..=0xE9 => offset('S', byte - 0xE2),
        0xF0..=0xF9 => offset('0', byte - 0xF0),
        0xFF => '\u{9f}',
        _ => return None,
    };
    Some(c)
}

/// UTF-16 output of a double-byte codepoint
pub fn double_byte_char(codepoint: u16) -> Option<char> {
    match codepoint {
        0x4040 => Some('\u{3000}'),
        0x42C1..=0x42C9 => char::from_u32(0xFF21 + u32::from(codepoint - 0x42C1)),
        0x42F0..=0x42F9 => char::from_u32(0xFF10 + u32::from(codepoint - 0x42F0)),
        // Outside the BMP: converts to a surrogate pair
        0x4481 => Some('\u{1F600}'),
        _ => None,
    }
}

fn offset(base: char, by: u8) -> char {
    char::from_u32(base as u32 + u32::from(by)).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Scalar result as `_ILECALLX` leaves it in the result slot
fn scalar(value: u32) -> TaggedPointer {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&value.to_ne_bytes());
    TaggedPointer::new(u64::from_ne_bytes(bytes), 0)
}

/// Local address behind a fake space pointer
fn local(pointer: &TaggedPointer) -> Option<*mut u8> {
    (pointer.hi == SPACE_TAG && pointer.lo != 0).then_some(pointer.lo as *mut u8)
}

unsafe fn signature_codes(signature: *const i16) -> Vec<i16> {
    let mut codes = Vec::new();
    for i in 0..32 {
        let code = *signature.add(i);
        codes.push(code);
        if code == ARG_END {
            break;
        }
    }
    codes
}

impl PasePrimitives for FakePase {
    unsafe fn set_space_pointer(&self, target: *mut TaggedPointer, addr: *const c_void) -> c_int {
        self.lock().count("_SETSPP");
        *target = TaggedPointer::new(SPACE_TAG, addr as u64);
        0
    }

    unsafe fn convert_space_pointer(&self, pointer: *const TaggedPointer) -> *mut c_void {
        self.lock().count("_CVTSPP");
        match local(&*pointer) {
            Some(addr) => addr as *mut c_void,
            None => std::ptr::null_mut(),
        }
    }

    unsafe fn load_object(&self, path: &CStr, flags: u32) -> u64 {
        let mut state = self.lock();
        state.count("_ILELOADX");
        if flags & ILELOAD_LIBOBJ == 0 {
            return ILELOAD_FAILED;
        }
        let path = path.to_string_lossy();
        state.objects.get(path.as_ref()).copied().unwrap_or(ILELOAD_FAILED)
    }

    unsafe fn resolve_symbol(
        &self,
        target: *mut TaggedPointer,
        mark: u64,
        name: &CStr,
    ) -> c_int {
        let mut state = self.lock();
        state.count("_ILESYMX");
        let name = name.to_string_lossy().into_owned();

        let exported = match state.object_of_mark(mark) {
            Some(object) => state
                .exports
                .get(object)
                .is_some_and(|exports| exports.contains(&name)),
            None => false,
        };
        if !exported {
            return 0;
        }

        let id = match state.procedures.iter().position(|p| *p == name) {
            Some(index) => index + 1,
            None => {
                state.procedures.push(name);
                state.procedures.len()
            }
        };
        *target = TaggedPointer::new(PROCEDURE_TAG, id as u64);
        ILESYM_PROCEDURE
    }

    unsafe fn call(
        &self,
        target: *const TaggedPointer,
        arglist: *mut c_void,
        signature: *const i16,
        result_type: i16,
        flags: c_int,
    ) -> c_int {
        let mut state = self.lock();
        state.count("_ILECALLX");

        let target = *target;
        if target.hi != PROCEDURE_TAG {
            return EXCEPTION_RC;
        }
        let name = match state.procedures.get((target.lo as usize).wrapping_sub(1)) {
            Some(name) => name.clone(),
            None => return EXCEPTION_RC,
        };
        state.count(&name);
        state.last_flags.insert(name.clone(), flags as u32);
        if let Some(rc) = state.failures.get(&name) {
            return *rc;
        }

        let codes = signature_codes(signature);
        match name.as_str() {
            "QtqIconvOpen" => iconv_open(&mut state, arglist, &codes, result_type),
            "iconv" => iconv(&mut state, arglist, &codes, result_type),
            "iconv_close" => iconv_close(&mut state, arglist, &codes, result_type),
            "__errno" => errno_location(arglist, &codes, result_type),
            _ => EXCEPTION_RC,
        }
    }

    unsafe fn resolve_object(
        &self,
        target: *mut TaggedPointer,
        object_type: u16,
        name: &CStr,
        library: &CStr,
    ) -> c_int {
        let mut state = self.lock();
        state.count("_RSLOBJ2");
        let key = (
            library.to_string_lossy().into_owned(),
            name.to_string_lossy().into_owned(),
        );
        if object_type != RSLOBJ_TS_PGM || !state.programs.contains(&key) {
            return EXCEPTION_RC;
        }
        *target = TaggedPointer::new(PROGRAM_TAG, 1);
        0
    }

    unsafe fn call_program(
        &self,
        target: *const TaggedPointer,
        argv: *mut *mut c_void,
        flags: u32,
    ) -> c_int {
        let mut state = self.lock();
        state.count("_PGMCALL");
        if (*target).hi != PROGRAM_TAG {
            return EXCEPTION_RC;
        }
        state.count("QTQGESP");
        state.last_flags.insert("QTQGESP".to_string(), flags);
        if let Some(rc) = state.failures.get("QTQGESP") {
            return *rc;
        }

        let mut args = Vec::new();
        for i in 0..8 {
            let arg = *argv.add(i);
            if arg.is_null() {
                break;
            }
            args.push(arg);
        }
        if args.len() != 6 {
            return EXCEPTION_RC;
        }

        let ccsid = *(args[0] as *const i32) as u32;
        let cspl_capacity = *(args[1] as *const i32);
        let scheme = args[3] as *mut i32;
        let feedback = args[5] as *mut [i32; 3];
        if cspl_capacity < 0 {
            return EXCEPTION_RC;
        }

        *feedback = [0; 3];
        match state.ccsids.get(&ccsid) {
            Some(FakeCcsid::SingleByte) | Some(FakeCcsid::Unconvertible) => {
                *scheme = SCHEME_EBCDIC_SBCS
            }
            Some(FakeCcsid::DoubleByte) => *scheme = SCHEME_EBCDIC_DBCS,
            Some(FakeCcsid::Scheme(code)) => *scheme = *code,
            Some(FakeCcsid::ProgramFailure) => return EXCEPTION_RC,
            None => *feedback = [3, 1, 0x0201],
        }
        0
    }

    unsafe fn copy_tagged(
        &self,
        target: *const TaggedPointer,
        source: *const TaggedPointer,
        len: usize,
    ) -> c_int {
        let mut state = self.lock();
        state.count("_MEMCPY_WT2");
        if let Some(rc) = state.failures.get("_MEMCPY_WT2") {
            return *rc;
        }

        let Some(dest) = local(&*target) else {
            return EXCEPTION_RC;
        };
        let source = *source;
        if source.hi == ERRNO_TAG {
            let bytes = state.errno.to_be_bytes();
            if len > bytes.len() {
                return EXCEPTION_RC;
            }
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), dest, len);
            return 0;
        }
        match local(&source) {
            Some(src) => {
                std::ptr::copy_nonoverlapping(src as *const u8, dest, len);
                0
            }
            None => EXCEPTION_RC,
        }
    }
}

/// Write an aggregate result through the address in the result slot
unsafe fn write_result<T: Copy>(base: &ArglistBase, value: T) -> c_int {
    if base.result.hi != 0 || base.result.lo == 0 {
        return EXCEPTION_RC;
    }
    *(base.result.lo as *mut T) = value;
    0
}

unsafe fn iconv_open(state: &mut State, arglist: *mut c_void, codes: &[i16], result: i16) -> c_int {
    if codes != [ARG_MEMPTR, ARG_MEMPTR, ARG_END]
        || result as usize != std::mem::size_of::<IconvT>()
    {
        return EXCEPTION_RC;
    }
    let args = &*(arglist as *const IconvOpenArglist);
    let to_code = *(args.to_code.addr() as *const QtqCode);
    let from_code = *(args.from_code.addr() as *const QtqCode);

    let source = from_code.ccsid as u32;
    let convertible = to_code.ccsid as u32 == UTF16_CCSID
        && matches!(
            state.ccsids.get(&source),
            Some(FakeCcsid::SingleByte) | Some(FakeCcsid::DoubleByte)
        );

    let descriptor = if convertible {
        let id = state.next_descriptor;
        state.next_descriptor += 1;
        state.descriptors.insert(id, source);
        let mut cd = [0i32; 12];
        cd[0] = id;
        IconvT { rtn: 0, cd }
    } else {
        state.errno = OPEN_ERRNO;
        IconvT {
            rtn: IconvT::OPEN_FAILED,
            cd: [0; 12],
        }
    };
    write_result(&args.base, descriptor)
}

unsafe fn iconv(state: &mut State, arglist: *mut c_void, codes: &[i16], result: i16) -> c_int {
    let descriptor_code = std::mem::size_of::<IconvT>() as i16;
    if codes != [descriptor_code, ARG_MEMPTR, ARG_MEMPTR, ARG_MEMPTR, ARG_MEMPTR, ARG_END]
        || result != RESULT_UINT32
    {
        return EXCEPTION_RC;
    }
    let args = &mut *(arglist as *mut IconvArglist);
    let in_cell = &mut *(args.in_buf.addr() as *mut TaggedPointer);
    let in_left = &mut *(args.in_len.addr() as *mut u32);
    let out_cell = &mut *(args.out_buf.addr() as *mut TaggedPointer);
    let out_left = &mut *(args.out_len.addr() as *mut u32);

    let (Some(input), Some(output)) = (local(in_cell), local(out_cell)) else {
        return EXCEPTION_RC;
    };

    let status = match state.descriptors.get(&args.cd.cd[0]).copied() {
        None => {
            state.errno = BAD_DESCRIPTOR_ERRNO;
            u32::MAX
        }
        Some(source) => {
            let bytes = std::slice::from_raw_parts(input as *const u8, *in_left as usize);
            let converted = match (state.ccsids.get(&source), bytes) {
                (Some(FakeCcsid::SingleByte), [byte]) => single_byte_char(*byte),
                (Some(FakeCcsid::DoubleByte), [hi, lo]) => {
                    double_byte_char(u16::from_be_bytes([*hi, *lo]))
                }
                _ => None,
            };

            let mut units = [0u16; 2];
            match converted.map(|c| c.encode_utf16(&mut units).len()) {
                Some(n) if n * 2 <= *out_left as usize => {
                    for (i, unit) in units[..n].iter().enumerate() {
                        let be = unit.to_be_bytes();
                        *output.add(i * 2) = be[0];
                        *output.add(i * 2 + 1) = be[1];
                    }
                    in_cell.lo += u64::from(*in_left);
                    *in_left = 0;
                    out_cell.lo += (n * 2) as u64;
                    *out_left -= (n * 2) as u32;
                    0
                }
                _ => {
                    state.errno = CONVERSION_ERRNO;
                    u32::MAX
                }
            }
        }
    };

    args.base.result = scalar(status);
    0
}

unsafe fn iconv_close(state: &mut State, arglist: *mut c_void, codes: &[i16], result: i16) -> c_int {
    let descriptor_code = std::mem::size_of::<IconvT>() as i16;
    if codes != [descriptor_code, ARG_END] || result != RESULT_INT32 {
        return EXCEPTION_RC;
    }
    let args = &mut *(arglist as *mut IconvCloseArglist);
    let rc = match state.descriptors.remove(&args.cd.cd[0]) {
        Some(_) => {
            state.closed += 1;
            0
        }
        None => {
            state.errno = BAD_DESCRIPTOR_ERRNO;
            -1
        }
    };
    args.base.result = scalar(rc as u32);
    0
}

unsafe fn errno_location(arglist: *mut c_void, codes: &[i16], result: i16) -> c_int {
    if codes != [ARG_END] || result != 16 {
        return EXCEPTION_RC;
    }
    let base = &*(arglist as *const ArglistBase);
    write_result(base, TaggedPointer::new(ERRNO_TAG, 0))
}
