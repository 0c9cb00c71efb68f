//! Global Configuration (~/.ccsid-dump/config.toml)
//!
//! Handles user-level defaults stored in `~/.ccsid-dump/config.toml`. Only the
//! output and runtime sections are meaningful there; the scan range belongs to
//! a run.

use crate::project::{BridgeConfig, DumpConfig, OutputConfig};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.ccsid-dump/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default report output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    /// Default PASE runtime settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeConfig>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.to_dump_config().validate()
    }

    /// Get the global config file path (~/.ccsid-dump/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".ccsid-dump").join("config.toml"))
    }

    /// The global settings as the lowest-precedence run configuration
    pub fn to_dump_config(&self) -> DumpConfig {
        DumpConfig {
            scan: None,
            output: self.output.clone(),
            bridge: self.bridge.clone(),
        }
    }
}
