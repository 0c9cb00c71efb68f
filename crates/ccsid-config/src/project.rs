//! Run configuration (ccsid-dump.toml)
//!
//! Handles the configuration stored in `ccsid-dump.toml` next to the output,
//! or anywhere above the working directory.

use crate::{ConfigError, ConfigResult, MAX_CCSID};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Run configuration from ccsid-dump.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DumpConfig {
    /// CCSID range to enumerate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanConfig>,

    /// Report output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    /// PASE runtime settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeConfig>,
}

/// CCSID range configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// First CCSID (default: 1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<u32>,

    /// Last CCSID, inclusive (default: 65534)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<u32>,

    /// CCSIDs never enumerated (default: 16684, 57777)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<Vec<u32>>,
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving IBM-<ccsid>.txt/.html (default: ".")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Write HTML grids for single-byte tables (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<bool>,
}

/// PASE runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// libc archive member exporting the ILE primitives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libc: Option<String>,

    /// CCSID tables are converted to (default: 1200)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_ccsid: Option<u32>,

    /// Resolve every ILE procedure before the first CCSID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preload: Option<bool>,
}

impl DumpConfig {
    /// Load run configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration text; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the values present in this file
    ///
    /// Range consistency is checked again after merging, since `first` and
    /// `last` may come from different sources.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(scan) = &self.scan {
            if let Some(first) = scan.first {
                validate_ccsid("scan.first", first)?;
            }
            if let Some(last) = scan.last {
                validate_ccsid("scan.last", last)?;
            }
            if let (Some(first), Some(last)) = (scan.first, scan.last) {
                if first > last {
                    return Err(ConfigError::ValidationError(format!(
                        "scan.first ({}) is greater than scan.last ({})",
                        first, last
                    )));
                }
            }
        }

        if let Some(bridge) = &self.bridge {
            if bridge.target_ccsid == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: "bridge.target_ccsid".to_string(),
                    reason: "CCSID 0 is not a conversion target".to_string(),
                });
            }
            if let Some(libc) = &bridge.libc {
                if libc.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "bridge.libc".to_string(),
                        reason: "path cannot be empty".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Merge another run config into this one
    /// Other config takes precedence for each value it sets
    pub fn merge(&mut self, other: &DumpConfig) {
        if let Some(scan) = &other.scan {
            let mine = self.scan.get_or_insert_with(Default::default);
            overlay(&mut mine.first, &scan.first);
            overlay(&mut mine.last, &scan.last);
            overlay(&mut mine.skip, &scan.skip);
        }
        if let Some(output) = &other.output {
            let mine = self.output.get_or_insert_with(Default::default);
            overlay(&mut mine.directory, &output.directory);
            overlay(&mut mine.html, &output.html);
        }
        if let Some(bridge) = &other.bridge {
            let mine = self.bridge.get_or_insert_with(Default::default);
            overlay(&mut mine.libc, &bridge.libc);
            overlay(&mut mine.target_ccsid, &bridge.target_ccsid);
            overlay(&mut mine.preload, &bridge.preload);
        }
    }
}

fn overlay<T: Clone>(mine: &mut Option<T>, theirs: &Option<T>) {
    if theirs.is_some() {
        mine.clone_from(theirs);
    }
}

pub(crate) fn validate_ccsid(field: &str, ccsid: u32) -> ConfigResult<()> {
    if ccsid == 0 || ccsid > MAX_CCSID {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("{} is outside 1..={}", ccsid, MAX_CCSID),
        });
    }
    Ok(())
}
