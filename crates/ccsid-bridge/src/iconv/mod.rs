//! Character conversion through the ILE `QTQICONV` service program
//!
//! [`CodecSession`] owns one conversion descriptor obtained from `QtqIconvOpen`
//! and converts one codepoint at a time with `iconv`.

pub mod layout;
pub mod session;

pub use layout::{IconvArglist, IconvCloseArglist, IconvOpenArglist, IconvT, QtqCode};
pub use session::{CodecSession, Conversion, ICONV_ERROR, MAX_INPUT, OUTPUT_CAPACITY};

/// UTF-16 (big-endian, no byte-order mark)
pub const UTF16_CCSID: u32 = 1200;

pub const OPEN_PROCEDURE: (&str, &str, &str) = ("QSYS", "QTQICONV", "QtqIconvOpen");
pub const CONVERT_PROCEDURE: (&str, &str, &str) = ("QSYS", "QTQICONV", "iconv");
pub const CLOSE_PROCEDURE: (&str, &str, &str) = ("QSYS", "QTQICONV", "iconv_close");

/// Every procedure a session calls
pub const PROCEDURES: [(&str, &str, &str); 3] = [OPEN_PROCEDURE, CONVERT_PROCEDURE, CLOSE_PROCEDURE];
