//! Byte layouts of the QTQICONV interface

use crate::ffi::arglist::{Arglist, ArglistBase, ForeignValue};
use crate::ffi::pointer::MemPointer;
use std::fmt;

/// Conversion-side description passed to `QtqIconvOpen`
///
/// The option fields are left at zero for the defaults: no best-fit mapping,
/// no substitution count, no shift-state reset, no length pre-scan and lenient
/// mixed-data handling.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QtqCode {
    pub ccsid: i32,
    pub conversion_alternative: i32,
    pub substitution_alternative: i32,
    pub shift_state_alternative: i32,
    pub input_length_option: i32,
    pub mixed_data_error_option: i32,
    pub _reserved: [u8; 8],
}

const _: () = {
    assert!(std::mem::size_of::<QtqCode>() == 32);
    assert!(std::mem::offset_of!(QtqCode, mixed_data_error_option) == 20);
    assert!(std::mem::offset_of!(QtqCode, _reserved) == 24);
};

impl QtqCode {
    /// Code carrying only a CCSID
    pub fn for_ccsid(ccsid: i32) -> Self {
        Self {
            ccsid,
            ..Self::default()
        }
    }
}

/// ILE conversion descriptor (`iconv_t`)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IconvT {
    /// `-1` when the open failed
    pub rtn: i32,
    pub cd: [i32; 12],
}

const _: () = {
    assert!(std::mem::size_of::<IconvT>() == 52);
    assert!(std::mem::align_of::<IconvT>() == 4);
};

unsafe impl ForeignValue for IconvT {}

impl IconvT {
    pub const OPEN_FAILED: i32 = -1;

    pub fn is_open_failure(&self) -> bool {
        self.rtn == Self::OPEN_FAILED
    }
}

impl fmt::Display for IconvT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iconv_t(rtn={}, cd={:?})", self.rtn, &self.cd[..3])
    }
}

/// `QtqIconvOpen(QtqCode_T *to, QtqCode_T *from)`
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Default)]
pub struct IconvOpenArglist {
    pub base: ArglistBase,
    pub to_code: MemPointer,
    pub from_code: MemPointer,
}

const _: () = {
    assert!(std::mem::size_of::<IconvOpenArglist>() == 64);
    assert!(std::mem::offset_of!(IconvOpenArglist, to_code) == 32);
    assert!(std::mem::offset_of!(IconvOpenArglist, from_code) == 48);
};

unsafe impl Arglist for IconvOpenArglist {
    fn base(&self) -> &ArglistBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ArglistBase {
        &mut self.base
    }
}

/// `iconv(iconv_t cd, char **in, size_t *in_left, char **out, size_t *out_left)`
///
/// The descriptor is passed by value and ends at byte 84; the buffer
/// arguments resume on the next 16-byte boundary.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Default)]
pub struct IconvArglist {
    pub base: ArglistBase,
    pub cd: IconvT,
    pub _pad: [u8; 12],
    pub in_buf: MemPointer,
    pub in_len: MemPointer,
    pub out_buf: MemPointer,
    pub out_len: MemPointer,
}

const _: () = {
    assert!(std::mem::size_of::<IconvArglist>() == 160);
    assert!(std::mem::offset_of!(IconvArglist, cd) == 32);
    assert!(std::mem::offset_of!(IconvArglist, _pad) == 84);
    assert!(std::mem::offset_of!(IconvArglist, in_buf) == 96);
    assert!(std::mem::offset_of!(IconvArglist, in_len) == 112);
    assert!(std::mem::offset_of!(IconvArglist, out_buf) == 128);
    assert!(std::mem::offset_of!(IconvArglist, out_len) == 144);
};

unsafe impl Arglist for IconvArglist {
    fn base(&self) -> &ArglistBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ArglistBase {
        &mut self.base
    }
}

/// `iconv_close(iconv_t cd)`
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Default)]
pub struct IconvCloseArglist {
    pub base: ArglistBase,
    pub cd: IconvT,
    pub _pad: [u8; 12],
}

const _: () = {
    assert!(std::mem::size_of::<IconvCloseArglist>() == 96);
    assert!(std::mem::offset_of!(IconvCloseArglist, cd) == 32);
};

unsafe impl Arglist for IconvCloseArglist {
    fn base(&self) -> &ArglistBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ArglistBase {
        &mut self.base
    }
}
