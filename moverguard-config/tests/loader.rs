use std::fs;
use std::time::Duration;

use moverguard_config::{ConfigLoadError, ConfigLoader, EnvConfig};
use tempfile::TempDir;

#[test]
fn environment_overrides_file_values() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("moverguard.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[server]
host = "127.0.0.1"
port = 9000

[paths]
config_dir = "{}"

[http]
upstream_timeout_secs = 10
"#,
            dir.path().join("from-file").display()
        ),
    )
    .unwrap();

    let env = EnvConfig {
        server_port: Some(7000),
        mover_log_dir: Some(dir.path().to_path_buf()),
        ..EnvConfig::default()
    };
    let load = ConfigLoader::new()
        .with_config_path(&config_path)
        .load_with_env(env)
        .unwrap();
    let config = load.config;

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 7000);
    assert_eq!(config.http.upstream_timeout, Duration::from_secs(10));
    assert_eq!(config.paths.config_dir, dir.path().join("from-file"));
    assert_eq!(
        config.paths.exclusions_file,
        dir.path().join("from-file").join("mover_exclusions.txt")
    );
    assert_eq!(
        config.metadata.config_path.as_deref(),
        Some(config_path.as_path())
    );
    assert!(config.paths.config_dir.is_dir());
    assert!(load.warnings.is_empty());
}

#[test]
fn defaults_apply_without_file_values() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("moverguard.toml");
    fs::write(&config_path, "").unwrap();

    let env = EnvConfig {
        config_dir: Some(dir.path().join("config")),
        ..EnvConfig::default()
    };
    let load = ConfigLoader::new()
        .with_config_path(&config_path)
        .load_with_env(env)
        .unwrap();

    assert_eq!(load.config.server.host, "0.0.0.0");
    assert_eq!(load.config.server.port, 5858);
    assert_eq!(load.config.http.upstream_timeout, Duration::from_secs(5));
    assert!(load.config.server.cors_allowed_origins.is_empty());
    assert_eq!(
        load.config.paths.settings_file,
        dir.path().join("config").join("settings.json")
    );
    // The mover log directory under the temp config dir does not exist.
    assert!(!load.warnings.is_empty());
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::new()
        .with_config_path(dir.path().join("absent.toml"))
        .load_with_env(EnvConfig::default());
    assert!(matches!(result, Err(ConfigLoadError::MissingConfig { .. })));
}

#[test]
fn malformed_file_reports_parse_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("moverguard.toml");
    fs::write(&config_path, "[server\nport = ").unwrap();

    let result = ConfigLoader::new()
        .with_config_path(&config_path)
        .load_with_env(EnvConfig::default());
    assert!(matches!(result, Err(ConfigLoadError::Parse { .. })));
}

#[test]
fn zero_timeout_falls_back_with_warning() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("moverguard.toml");
    fs::write(&config_path, "").unwrap();

    let env = EnvConfig {
        config_dir: Some(dir.path().join("config")),
        mover_log_dir: Some(dir.path().to_path_buf()),
        upstream_timeout: Some(Duration::ZERO),
        ..EnvConfig::default()
    };
    let load = ConfigLoader::new()
        .with_config_path(&config_path)
        .load_with_env(env)
        .unwrap();

    assert_eq!(load.config.http.upstream_timeout, Duration::from_secs(5));
    assert_eq!(load.warnings.items.len(), 1);
}
