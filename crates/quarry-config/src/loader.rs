//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::{validate_packages_path, GlobalConfig, ResourcesConfig};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Search roots override, in the platform's path-list syntax
pub const PACKAGES_PATH_ENV: &str = "QUARRY_PACKAGES_PATH";

/// Schema generation override
pub const CONFIG_VERSION_ENV: &str = "QUARRY_CONFIG_VERSION";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.quarry/config.toml) - lowest priority
/// 2. Environment variables (QUARRY_*) - overrides the file
/// 3. Explicit arguments - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration with environment overrides applied
    pub global: GlobalConfig,

    /// File the configuration was read from, if any
    pub source: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Create a loader that reads the global config from a custom location
    pub fn with_global_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load the global configuration (if present) and apply environment overrides
    pub fn load(&mut self) -> ConfigResult<Config> {
        let path = self.global_path()?.to_path_buf();

        // Global config is optional - if it doesn't exist, start from defaults
        let (global, source) = if path.exists() {
            (GlobalConfig::load_from_file(&path)?, Some(path))
        } else {
            (GlobalConfig::default(), None)
        };

        Ok(Config {
            global: self.apply_env_overrides(global)?,
            source,
        })
    }

    /// Load configuration from a specific config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let global = GlobalConfig::load_from_file(config_path)?;

        Ok(Config {
            global: self.apply_env_overrides(global)?,
            source: Some(config_path.to_path_buf()),
        })
    }

    fn global_path(&mut self) -> ConfigResult<&Path> {
        if self.global_config_path.is_none() {
            self.global_config_path = Some(GlobalConfig::global_config_path()?);
        }
        self.global_config_path
            .as_deref()
            .ok_or(ConfigError::HomeNotFound)
    }

    /// Apply environment variable overrides
    ///
    /// QUARRY_PACKAGES_PATH replaces the configured search roots,
    /// QUARRY_CONFIG_VERSION replaces the schema generation.
    fn apply_env_overrides(&self, mut config: GlobalConfig) -> ConfigResult<GlobalConfig> {
        if let Some(raw) = env::var_os(PACKAGES_PATH_ENV) {
            let paths: Vec<PathBuf> = env::split_paths(&raw).collect();
            validate_packages_path(PACKAGES_PATH_ENV, &paths)?;
            config.merge(&GlobalConfig {
                resources: Some(ResourcesConfig {
                    packages_path: paths,
                    config_version: None,
                }),
            });
        }

        if let Ok(raw) = env::var(CONFIG_VERSION_ENV) {
            let version = raw
                .trim()
                .parse::<u32>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: CONFIG_VERSION_ENV.to_string(),
                    reason: format!("'{}': {}", raw, e),
                })?;
            config.merge(&GlobalConfig {
                resources: Some(ResourcesConfig {
                    packages_path: Vec::new(),
                    config_version: Some(version),
                }),
            });
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Search roots in scan order
    pub fn packages_path(&self) -> &[PathBuf] {
        self.global.packages_path()
    }

    /// Effective schema generation (configured > 0)
    pub fn config_version(&self) -> u32 {
        self.global.config_version().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join("config.toml");
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    #[serial]
    fn test_missing_global_config_is_default() {
        let temp_dir = TempDir::new().unwrap();

        let mut loader = ConfigLoader::with_global_path(temp_dir.path().join("config.toml"));
        let config = loader.load().unwrap();

        assert!(config.packages_path().is_empty());
        assert_eq!(config.config_version(), 0);
        assert!(config.source.is_none());
    }

    #[test]
    #[serial]
    fn test_load_global_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_config_file(
            temp_dir.path(),
            r#"
[resources]
packages_path = ["/repo/packages"]
config_version = 0
"#,
        );

        let mut loader = ConfigLoader::with_global_path(&path);
        let config = loader.load().unwrap();

        assert_eq!(config.packages_path(), &[PathBuf::from("/repo/packages")]);
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    #[serial]
    fn test_env_override_packages_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_config_file(
            temp_dir.path(),
            r#"
[resources]
packages_path = ["/from/file"]
"#,
        );

        let joined = env::join_paths(["/env/a", "/env/b"]).unwrap();
        env::set_var(PACKAGES_PATH_ENV, &joined);

        let mut loader = ConfigLoader::new();
        let config = loader.load_from_file(&path).unwrap();

        env::remove_var(PACKAGES_PATH_ENV);

        assert_eq!(
            config.packages_path(),
            &[PathBuf::from("/env/a"), PathBuf::from("/env/b")]
        );
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_config_version() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var(CONFIG_VERSION_ENV, "zero");

        let mut loader = ConfigLoader::with_global_path(temp_dir.path().join("config.toml"));
        let result = loader.load();

        env::remove_var(CONFIG_VERSION_ENV);

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
