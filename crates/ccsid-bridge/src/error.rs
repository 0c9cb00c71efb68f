//! Bridge error types

use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("PASE runtime unavailable at {path}: {reason}")]
    RuntimeUnavailable { path: String, reason: String },

    #[error("ILE object {object} not found")]
    ObjectNotFound { object: String },

    #[error("Procedure '{symbol}' not found in {object}")]
    SymbolNotFound { object: String, symbol: String },

    #[error("Program {library}/{program} could not be resolved (rc={rc})")]
    ProgramNotFound {
        library: String,
        program: String,
        rc: i32,
    },

    #[error("Call to {target} failed with rc={rc} (flags={flags:#x})")]
    Invocation { target: String, rc: i32, flags: u32 },

    #[error("Could not open converter from CCSID {source_ccsid} to CCSID {target_ccsid}{}", errno_suffix(.errno))]
    OpenFailure {
        target_ccsid: u32,
        source_ccsid: u32,
        errno: Option<u32>,
    },

    #[error("CCSID {ccsid} has no supported encoding scheme")]
    UnsupportedScheme { ccsid: u32 },

    #[error("Name {0:?} contains a NUL byte")]
    InvalidName(String),

    #[error("Invalid call signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid conversion input: {0}")]
    InvalidInput(String),

    #[error("Protocol error from {target}: {detail}")]
    Protocol { target: String, detail: String },
}

fn errno_suffix(errno: &Option<u32>) -> String {
    match errno {
        Some(errno) => format!(" (errno {})", errno),
        None => String::new(),
    }
}

impl BridgeError {
    /// Whether the error comes from resolving an object, procedure or program
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            BridgeError::ObjectNotFound { .. }
                | BridgeError::SymbolNotFound { .. }
                | BridgeError::ProgramNotFound { .. }
        )
    }

    /// Whether the error is a nonzero return from `_ILECALLX` or `_PGMCALL`
    pub fn is_invocation(&self) -> bool {
        matches!(self, BridgeError::Invocation { .. })
    }
}
