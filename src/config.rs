//! Dispatcher configuration, optionally loaded from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default name of the result key holding the selected subcommand.
pub const DEFAULT_SUBCOMMAND_KEY: &str = "subcommand";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "MODECLI_CONFIG";

/// Settings fixed before the first parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Register `-h/--help` among the common options.
    pub add_help: bool,
    /// Result key under which the selected subcommand name is stored.
    pub subcommand_key: String,
    /// Subcommand selected when the command line names none.
    pub default_subcommand: Option<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            add_help: true,
            subcommand_key: DEFAULT_SUBCOMMAND_KEY.to_string(),
            default_subcommand: None,
        }
    }
}

impl DispatcherConfig {
    /// Returns the path to the configuration file.
    ///
    /// `MODECLI_CONFIG` wins; otherwise `modecli/config.toml` under
    /// `dirs::config_dir()`, falling back to the current directory.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("modecli").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// A missing file yields `DispatcherConfig::default()`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads and validates configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: DispatcherConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded dispatcher config");
        Ok(config)
    }

    /// Checks that the subcommand key is usable as an option name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subcommand_key.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "subcommand_key must not be empty".to_string(),
            });
        }
        if self.subcommand_key.starts_with('-') {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "subcommand_key '{}' must not start with '-'",
                    self.subcommand_key
                ),
            });
        }
        if matches!(&self.default_subcommand, Some(name) if name.is_empty()) {
            return Err(ConfigError::ValidationError {
                message: "default_subcommand must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
