//! Unit tests for configuration loading and graceful degradation
//!
//! Tests:
//! - Full and partial TOML files
//! - Missing config files fall back to defaults
//! - Malformed or invalid files are configuration errors
//! - Priority order for config file resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate SEAMLOOP_CONFIG are marked with #[serial].

use seamloop_common::config::{resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use seamloop_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_config_parses() {
    let config = TomlConfig::from_toml_str(
        r#"
        [playback]
        device = "Speakers"
        buffer_size = 256
        volume = 0.5

        [loop]
        enabled = true
        start_seconds = 1.0
        end_seconds = 3.5

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.playback.device.as_deref(), Some("Speakers"));
    assert_eq!(config.playback.buffer_size, Some(256));
    assert_eq!(config.playback.volume, 0.5);
    assert!(config.loop_window.enabled);
    assert_eq!(config.loop_window.bounds().unwrap(), Some((1.0, 3.5)));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_partial_config_uses_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        [loop]
        start_seconds = 0.25
        end_seconds = 0.75
        "#,
    )
    .unwrap();

    assert_eq!(config.playback.volume, 1.0);
    assert!(config.playback.buffer_size.is_none());
    assert!(!config.loop_window.enabled);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_empty_config_is_default() {
    let config = TomlConfig::from_toml_str("").unwrap();
    assert_eq!(config.playback.volume, 1.0);
    assert_eq!(config.loop_window.bounds().unwrap(), None);
}

#[test]
fn test_malformed_config_is_error() {
    let result = TomlConfig::from_toml_str("[loop\nenabled = ");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_inverted_loop_is_error() {
    let result = TomlConfig::from_toml_str(
        r#"
        [loop]
        start_seconds = 4.0
        end_seconds = 2.0
        "#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_volume_out_of_range_is_error() {
    let result = TomlConfig::from_toml_str("[playback]\nvolume = 1.5\n");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_load_from_file() {
    let file = write_config("[logging]\nlevel = \"warn\"\n");
    let config = TomlConfig::load(file.path()).unwrap();
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_load_or_default_missing_file() {
    let config =
        TomlConfig::load_or_default(Some(Path::new("/nonexistent/seamloop/config.toml"))).unwrap();
    assert_eq!(config.playback.volume, 1.0);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_load_or_default_malformed_file_is_error() {
    let file = write_config("volume = [");
    assert!(TomlConfig::load_or_default(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_resolve_cli_argument_wins() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/seamloop-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/seamloop-cli.toml")), CONFIG_ENV_VAR);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/seamloop-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_resolve_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/seamloop-env.toml");

    let resolved = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/seamloop-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_resolve_without_overrides() {
    env::remove_var(CONFIG_ENV_VAR);

    // Only the user config file can be found, and only if it exists
    let resolved = resolve_config_path(None, CONFIG_ENV_VAR);
    if let Some(path) = resolved {
        assert!(path.ends_with("seamloop/config.toml"));
        assert!(path.exists());
    }
}
