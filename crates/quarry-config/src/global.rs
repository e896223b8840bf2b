//! Global Configuration (~/.quarry/config.toml)
//!
//! Handles user-level configuration stored in `~/.quarry/config.toml`.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.quarry/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Resource discovery settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesConfig>,
}

/// Resource discovery settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ResourcesConfig {
    /// Package search roots, scanned in order
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packages_path: Vec<PathBuf>,

    /// Schema generation used for requests (default: 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_version: Option<u32>,
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
        if let Some(resources) = &self.resources {
            validate_packages_path("resources.packages_path", &resources.packages_path)?;
        }
        Ok(())
    }

    /// Get the global config file path (~/.quarry/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".quarry").join("config.toml"))
    }

    /// Configured search roots, empty when unset
    pub fn packages_path(&self) -> &[PathBuf] {
        self.resources
            .as_ref()
            .map(|r| r.packages_path.as_slice())
            .unwrap_or(&[])
    }

    /// Configured schema generation
    pub fn config_version(&self) -> Option<u32> {
        self.resources.as_ref().and_then(|r| r.config_version)
    }

    /// Merge another global config into this one
    /// Other config takes precedence for set values
    pub fn merge(&mut self, other: &GlobalConfig) {
        let Some(theirs) = &other.resources else {
            return;
        };
        let ours = self.resources.get_or_insert_with(Default::default);
        if !theirs.packages_path.is_empty() {
            ours.packages_path = theirs.packages_path.clone();
        }
        if theirs.config_version.is_some() {
            ours.config_version = theirs.config_version;
        }
    }
}

/// Reject empty search root entries
pub(crate) fn validate_packages_path(field: &str, paths: &[PathBuf]) -> ConfigResult<()> {
    if let Some(pos) = paths.iter().position(|p| p.as_os_str().is_empty()) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("entry {} is an empty path", pos),
        });
    }
    Ok(())
}
