//! ccsid-dump configuration
//!
//! Provides configuration management for codepage table dumps:
//! - Run configuration (ccsid-dump.toml)
//! - Global user configuration (~/.ccsid-dump/config.toml)
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.ccsid-dump/config.toml)
//! 2. Run config (./ccsid-dump.toml, searched upward)
//! 3. Environment variables (CCSID_DUMP_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use ccsid_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("scanning {}..={}", config.first(), config.last());
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// File name searched for in the working directory and its parents
pub const CONFIG_FILE_NAME: &str = "ccsid-dump.toml";

pub const DEFAULT_FIRST_CCSID: u32 = 1;
pub const DEFAULT_LAST_CCSID: u32 = 65534;
pub const MAX_CCSID: u32 = 65535;

/// CCSIDs whose codepoints span several units and cannot be enumerated
pub const DEFAULT_SKIP: [u32; 2] = [16684, 57777];

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::DumpConfig;
