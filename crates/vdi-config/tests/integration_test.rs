//! Integration tests for vdi-config
//!
//! These tests verify the full config loading pipeline with real file system operations.

use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::tempdir;
use vdi_config::path::{ensure_dir, DIR_MODE};
use vdi_config::{Config, LogFormat};

/// Test config loading from a real config file
#[test]
fn test_load_config_from_file() {
    let temp = tempdir().unwrap();
    let vdi_dir = temp.path().join(".vdi");
    std::fs::create_dir_all(&vdi_dir).unwrap();

    let config_content = r#"
[log]
dir = "/var/log/vdi"
file_prefix = "audit."
file_suffix = ".log"
format = "minimal"
debug_level = 2

[fetch]
enabled = false
download_base = "/srv/vdi/cache"
timeout_secs = 60
"#;
    std::fs::write(vdi_dir.join("config.toml"), config_content).unwrap();

    let contents = std::fs::read_to_string(vdi_dir.join("config.toml")).unwrap();
    let config: Config = toml::from_str(&contents).unwrap();

    assert_eq!(
        config.log.log_path(1234),
        PathBuf::from("/var/log/vdi/audit.1234.log")
    );
    assert_eq!(config.log.format, LogFormat::Minimal);
    assert_eq!(config.log.debug_level, 2);
    assert!(!config.fetch.enabled);
    assert_eq!(
        config.fetch.download_base("anyone"),
        PathBuf::from("/srv/vdi/cache")
    );
    assert_eq!(config.fetch.timeout_secs, Some(60));
}

/// Environment values win over the file
#[test]
fn test_environment_overrides_file() {
    let file: Config = toml::from_str(
        r#"
[log]
dir = "/from/file"
file_prefix = "file."
"#,
    )
    .unwrap();

    let env: HashMap<&str, &str> = [("VDI_LOG_DIR", "/from/env")].into_iter().collect();
    let mut merged = file.clone();
    merged.apply_overrides_from(|name| env.get(name).map(|v| v.to_string()));

    assert_eq!(merged.log.dir, "/from/env");
    assert_eq!(merged.log.file_prefix, "file.");
    assert_eq!(merged.log.log_path(5), PathBuf::from("/from/env/file.5"));
}

/// Generated default TOML is accepted back by the loader
#[test]
fn test_default_toml_file_loads() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, Config::default_toml().unwrap()).unwrap();

    let config: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(config, Config::default());
}

/// Log directory creation is idempotent on a real tree
#[test]
fn test_log_dir_creation_is_idempotent() {
    let temp = tempdir().unwrap();
    let dir = temp.path().join("testlogs/nested");

    ensure_dir(&dir, DIR_MODE).unwrap();
    ensure_dir(&dir, DIR_MODE).unwrap();
    assert!(dir.is_dir());
}

/// The preload library installs diagnostics through the crate-root path.
#[test]
fn test_init_logging_from_crate_root() {
    let level = Config::default().log.debug_level;
    vdi_config::init_logging(level);
    vdi_config::init_logging(level);
    assert_eq!(
        vdi_config::logging::level_for_debug(level),
        tracing::level_filters::LevelFilter::ERROR
    );
}
