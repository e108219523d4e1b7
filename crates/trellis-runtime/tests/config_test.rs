//! Configuration loading tests

use std::io::Write;

use trellis_runtime::{ConfigLoader, RuntimeConfig};

#[test]
fn test_defaults_without_sources() {
    let config = ConfigLoader::new()
        .with_env_prefix("TRELLIS_TEST_NONE")
        .load()
        .unwrap();
    assert_eq!(config.logging.level, "info");
    assert!(!config.logging.json_format);
    assert_eq!(config.build.root_container, "app");
    assert_eq!(config.build.cycle_report_limit, 16);
}

#[test]
fn test_toml_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[logging]
level = "debug"
json_format = true

[build]
root_container = "web"
"#
    )
    .unwrap();

    let config = ConfigLoader::new()
        .with_config_path(file.path())
        .with_env_prefix("TRELLIS_TEST_TOML")
        .load()
        .unwrap();
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json_format);
    assert_eq!(config.build.root_container, "web");
    // Untouched keys keep their defaults.
    assert_eq!(config.build.cycle_report_limit, 16);
}

#[test]
fn test_env_overrides_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();

    std::env::set_var("TRELLIS_TEST_ENV_LOGGING_LEVEL", "trace");
    let config = ConfigLoader::new()
        .with_config_path(file.path())
        .with_env_prefix("TRELLIS_TEST_ENV")
        .load()
        .unwrap();
    std::env::remove_var("TRELLIS_TEST_ENV_LOGGING_LEVEL");

    assert_eq!(config.logging.level, "trace");
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let config = ConfigLoader::new()
        .with_config_path("/nonexistent/trellis.toml")
        .with_env_prefix("TRELLIS_TEST_MISSING")
        .load()
        .unwrap();
    assert_eq!(config.logging.level, RuntimeConfig::default().logging.level);
}

#[test]
fn test_malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[logging\nlevel=").unwrap();

    let result = ConfigLoader::new()
        .with_config_path(file.path())
        .with_env_prefix("TRELLIS_TEST_BAD")
        .load();
    assert!(result.is_err());
}
