//! Configuration loading and precedence tests

use pretty_assertions::assert_eq;
use quarry_config::{ConfigError, ConfigLoader};
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join("config.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_search_roots_keep_file_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(
        temp_dir.path(),
        r#"
[resources]
packages_path = ["/z/last-alphabetically", "/a/first-alphabetically"]
"#,
    );

    let mut loader = ConfigLoader::new();
    let config = loader.load_from_file(&path).unwrap();

    assert_eq!(
        config.packages_path(),
        &[
            PathBuf::from("/z/last-alphabetically"),
            PathBuf::from("/a/first-alphabetically")
        ]
    );
}

#[test]
#[serial]
fn test_empty_config_file_is_valid() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "");

    let mut loader = ConfigLoader::new();
    let config = loader.load_from_file(&path).unwrap();

    assert!(config.packages_path().is_empty());
    assert_eq!(config.config_version(), 0);
}

#[test]
#[serial]
fn test_explicit_file_must_exist() {
    let temp_dir = TempDir::new().unwrap();

    let mut loader = ConfigLoader::new();
    let result = loader.load_from_file(&temp_dir.path().join("missing.toml"));

    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

// ============================================================================
// Invalid Config Tests
// ============================================================================

#[rstest]
#[case::bad_syntax("[resources\npackages_path = [")]
#[case::unknown_field("[resources]\npackages_path = []\ncache = true\n")]
#[case::wrong_type("[resources]\nconfig_version = \"zero\"\n")]
#[case::empty_root("[resources]\npackages_path = [\"\"]\n")]
#[serial]
fn test_invalid_config_rejected(#[case] content: &str) {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), content);

    let mut loader = ConfigLoader::new();
    assert!(loader.load_from_file(&path).is_err());
}

// ============================================================================
// Environment Override Tests
// ============================================================================

#[test]
#[serial]
fn test_env_config_version_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(
        temp_dir.path(),
        r#"
[resources]
packages_path = ["/repo"]
config_version = 0
"#,
    );

    env::set_var("QUARRY_CONFIG_VERSION", "1");

    let mut loader = ConfigLoader::new();
    let config = loader.load_from_file(&path).unwrap();

    env::remove_var("QUARRY_CONFIG_VERSION");

    assert_eq!(config.config_version(), 1);
    assert_eq!(config.packages_path(), &[PathBuf::from("/repo")]);
}
