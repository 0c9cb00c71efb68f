//! ccsid-bridge - calling ILE conversion services from IBM i PASE
//!
//! The crate is layered bottom-up:
//! - [`ffi`]: tagged pointers, call conventions and the [`Bridge`]
//! - [`iconv`]: conversion sessions over `QTQICONV`
//! - [`probe`]: encoding-scheme classification through `QTQGESP`
//! - [`table`]: full codepage tables built from a session
//! - `testing` (feature `testing`): a simulated ILE environment for hosts
//!   without one

pub mod error;
pub mod ffi;
pub mod iconv;
pub mod probe;
pub mod table;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{BridgeError, BridgeResult};
pub use ffi::{Bridge, PaseLibc, PasePrimitives, DEFAULT_LIBC_PATH};
pub use iconv::{CodecSession, Conversion, UTF16_CCSID};
pub use probe::{classify, EncodingScheme};
pub use table::{build, build_with_target, CodepageTable};
