//! Quarry Configuration
//!
//! Settings that tell the resource engine where to look and which schema
//! generation to use:
//! - Global user configuration (~/.quarry/config.toml)
//! - Explicit configuration files
//! - Environment overrides (QUARRY_*)
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.quarry/config.toml) or an explicit file
//! 2. Environment variables (QUARRY_PACKAGES_PATH, QUARRY_CONFIG_VERSION)
//!
//! # Example
//!
//! ```no_run
//! use quarry_config::ConfigLoader;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load().unwrap();
//! println!("{:?}", config.packages_path());
//! ```

pub mod global;
pub mod loader;

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

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use global::{GlobalConfig, ResourcesConfig};
pub use loader::{Config, ConfigLoader};
