//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{validate_ccsid, DumpConfig};
use crate::{
    ConfigError, ConfigResult, CONFIG_FILE_NAME, DEFAULT_FIRST_CCSID, DEFAULT_LAST_CCSID,
    DEFAULT_SKIP,
};
use std::env;
use std::path::{Path, PathBuf};

pub const ENV_OUTPUT_DIR: &str = "CCSID_DUMP_OUTPUT_DIR";
pub const ENV_LIBC: &str = "CCSID_DUMP_LIBC";
pub const ENV_HTML: &str = "CCSID_DUMP_HTML";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.ccsid-dump/config.toml) - lowest priority
/// 2. Run config (./ccsid-dump.toml) - overrides global
/// 3. Environment variables (CCSID_DUMP_*) - overrides run config
/// 4. CLI flags - highest priority (applied by the caller with [`Config::apply`])
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Every source merged, highest precedence last
    pub settings: DumpConfig,

    /// Run configuration file that was loaded, if any
    pub config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Loader reading global defaults from `path` instead of the home directory
    pub fn with_global_config(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find ccsid-dump.toml, then merges it over
    /// the global config if one exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (config_path, run_config) = self.find_run_config(start_dir)?;
        self.assemble(run_config, config_path)
    }

    /// Load configuration from a specific run config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let run_config = DumpConfig::load_from_file(config_path)?;
        self.assemble(run_config, Some(config_path.to_path_buf()))
    }

    fn assemble(&mut self, run_config: DumpConfig, config_path: Option<PathBuf>) -> ConfigResult<Config> {
        let mut settings = self.load_global_config()?.to_dump_config();
        settings.merge(&run_config);
        self.apply_env_overrides(&mut settings)?;

        let config = Config {
            settings,
            config_path,
        };
        config.validate()?;
        Ok(config)
    }

    /// Find run configuration by walking up directory tree
    ///
    /// Returns (config_path, run_config); the default config when none is found
    fn find_run_config(&self, start_dir: &Path) -> ConfigResult<(Option<PathBuf>, DumpConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let run_config = DumpConfig::load_from_file(&config_path)?;
                return Ok((Some(config_path), run_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, DumpConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.ccsid-dump/config.toml
    ///
    /// A missing file or home directory means no global defaults; a file that
    /// exists but is invalid is an error.
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        if self.global_config_path.is_none() {
            match GlobalConfig::global_config_path() {
                Ok(path) => self.global_config_path = Some(path),
                Err(ConfigError::HomeNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            }
        }

        match &self.global_config_path {
            Some(path) if path.exists() => GlobalConfig::load_from_file(path),
            _ => Ok(GlobalConfig::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Recognized: CCSID_DUMP_OUTPUT_DIR, CCSID_DUMP_LIBC, CCSID_DUMP_HTML
    fn apply_env_overrides(&self, settings: &mut DumpConfig) -> ConfigResult<()> {
        if let Ok(directory) = env::var(ENV_OUTPUT_DIR) {
            settings
                .output
                .get_or_insert_with(Default::default)
                .directory = Some(PathBuf::from(directory));
        }

        if let Ok(libc) = env::var(ENV_LIBC) {
            settings.bridge.get_or_insert_with(Default::default).libc = Some(libc);
        }

        if let Ok(html) = env::var(ENV_HTML) {
            let html = parse_bool(ENV_HTML, &html)?;
            settings.output.get_or_insert_with(Default::default).html = Some(html);
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{}'", value),
        }),
    }
}

impl Config {
    /// Configuration with every value at its default
    pub fn defaults() -> Self {
        Self {
            settings: DumpConfig::default(),
            config_path: None,
        }
    }

    /// Overlay higher-precedence settings (CLI flags) and re-validate
    pub fn apply(&mut self, overrides: &DumpConfig) -> ConfigResult<()> {
        self.settings.merge(overrides);
        self.validate()
    }

    /// Validate the merged values
    pub fn validate(&self) -> ConfigResult<()> {
        let (first, last) = (self.first(), self.last());
        validate_ccsid("scan.first", first)?;
        validate_ccsid("scan.last", last)?;
        if first > last {
            return Err(ConfigError::ValidationError(format!(
                "scan.first ({}) is greater than scan.last ({})",
                first, last
            )));
        }
        self.settings.validate()
    }

    /// First CCSID of the scan
    pub fn first(&self) -> u32 {
        self.settings
            .scan
            .as_ref()
            .and_then(|s| s.first)
            .unwrap_or(DEFAULT_FIRST_CCSID)
    }

    /// Last CCSID of the scan, inclusive
    pub fn last(&self) -> u32 {
        self.settings
            .scan
            .as_ref()
            .and_then(|s| s.last)
            .unwrap_or(DEFAULT_LAST_CCSID)
    }

    /// CCSIDs that are never enumerated
    pub fn skip(&self) -> &[u32] {
        self.settings
            .scan
            .as_ref()
            .and_then(|s| s.skip.as_deref())
            .unwrap_or(&DEFAULT_SKIP)
    }

    /// Directory receiving the reports
    pub fn output_dir(&self) -> &Path {
        self.settings
            .output
            .as_ref()
            .and_then(|o| o.directory.as_deref())
            .unwrap_or(Path::new("."))
    }

    /// Whether HTML grids are written for single-byte tables
    pub fn html(&self) -> bool {
        self.settings
            .output
            .as_ref()
            .and_then(|o| o.html)
            .unwrap_or(true)
    }

    /// Configured libc member, if any
    pub fn libc(&self) -> Option<&str> {
        self.settings
            .bridge
            .as_ref()
            .and_then(|b| b.libc.as_deref())
    }

    /// Configured conversion target, if any
    pub fn target_ccsid(&self) -> Option<u32> {
        self.settings.bridge.as_ref().and_then(|b| b.target_ccsid)
    }

    pub fn preload(&self) -> bool {
        self.settings
            .bridge
            .as_ref()
            .and_then(|b| b.preload)
            .unwrap_or(false)
    }

    /// Run configuration file that was loaded
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    fn isolated_loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::with_global_config(dir.join("no-global.toml"))
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let config = Config::defaults();
        assert_eq!(config.first(), 1);
        assert_eq!(config.last(), 65534);
        assert_eq!(config.skip(), &[16684, 57777]);
        assert_eq!(config.output_dir(), Path::new("."));
        assert!(config.html());
        assert!(!config.preload());
        assert_eq!(config.libc(), None);
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[scan]\nfirst = 37\n");

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let mut loader = isolated_loader(temp_dir.path());
        let config = loader.load_from_directory(&sub_dir).unwrap();

        assert_eq!(config.first(), 37);
        assert_eq!(
            config.config_path(),
            Some(temp_dir.path().join(CONFIG_FILE_NAME).as_path())
        );
    }

    #[test]
    #[serial]
    fn test_env_override_html() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[output]\nhtml = true\n");

        env::set_var(ENV_HTML, "no");

        let mut loader = isolated_loader(temp_dir.path());
        let config = loader.load_from_directory(temp_dir.path()).unwrap();
        assert!(!config.html());

        env::remove_var(ENV_HTML);
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_bool() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var(ENV_HTML, "sometimes");

        let mut loader = isolated_loader(temp_dir.path());
        let result = loader.load_from_directory(temp_dir.path());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        env::remove_var(ENV_HTML);
    }

    #[test]
    #[serial]
    fn test_apply_overrides_revalidates() {
        let mut config = Config::defaults();
        let overrides = DumpConfig::parse("[scan]\nfirst = 65535\n", Path::new("cli")).unwrap();
        let result = config.apply(&overrides);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
