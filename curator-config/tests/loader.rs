use std::collections::HashMap;
use std::fs;

use curator_config::{ConfigLoadError, ConfigLoader, EnvConfig};

fn env(pairs: &[(&str, &str)]) -> EnvConfig {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    EnvConfig::from_map(&map)
}

#[test]
fn file_values_layer_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curator.toml");
    fs::write(
        &path,
        r#"
        [server]
        port = 8080

        [database]
        url = "postgres://curator@localhost/curator"

        [jellyfin]
        url = "http://jellyfin.local:8096/"
        api_key = "abc123"

        [operations]
        batch_size = 25
        "#,
    )
    .unwrap();

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(EnvConfig::default())
        .unwrap();
    let config = load.config;

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.operations.batch_size, 25);
    assert_eq!(config.operations.preview_ttl_secs, 1800);
    assert_eq!(config.operations.max_concurrent_jobs, 2);
    assert_eq!(config.scan.batch_size, 50);
    assert!(config.providers.tvmaze_enabled);

    let jellyfin = config.jellyfin.expect("jellyfin section");
    assert_eq!(jellyfin.url, "http://jellyfin.local:8096");
    assert_eq!(jellyfin.api_key, "abc123");
    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));

    assert!(
        load.warnings
            .iter()
            .all(|w| !w.message.contains("in-memory"))
    );
}

#[test]
fn environment_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curator.toml");
    fs::write(
        &path,
        r#"
        [operations]
        batch_size = 25
        batch_delay_ms = 100

        [cors]
        allowed_origins = ["http://file.test"]
        "#,
    )
    .unwrap();

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(env(&[
            ("CURATOR_JOB_BATCH_SIZE", "5"),
            ("CURATOR_CORS_ORIGINS", "http://a.test, http://b.test"),
            ("TVMAZE_ENABLED", "false"),
        ]))
        .unwrap();

    assert_eq!(load.config.operations.batch_size, 5);
    assert_eq!(load.config.operations.batch_delay_ms, 100);
    assert_eq!(
        load.config.cors.allowed_origins,
        vec!["http://a.test".to_string(), "http://b.test".to_string()]
    );
    assert!(!load.config.providers.tvmaze_enabled);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::new()
        .with_config_path(dir.path().join("nope.toml"))
        .load_with_env(EnvConfig::default())
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn env_config_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    let err = ConfigLoader::new()
        .load_with_env(env(&[(
            "CURATOR_CONFIG_PATH",
            missing.to_str().unwrap(),
        )]))
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn unknown_keys_fail_to_parse() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curator.toml");
    fs::write(&path, "[operations]\nbatchsize = 3\n").unwrap();

    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(EnvConfig::default())
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::Parse { .. }));
}

#[test]
fn zero_values_are_rejected() {
    let err = ConfigLoader::new()
        .load_with_env(env(&[("CURATOR_PREVIEW_TTL_SECS", "0")]))
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::GuardRail(_)));
}

#[test]
fn jellyfin_url_without_key_is_rejected() {
    let err = ConfigLoader::new()
        .load_with_env(env(&[("JELLYFIN_URL", "http://jellyfin.local")]))
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingJellyfinApiKey));
}

#[test]
fn bare_environment_warns_but_loads() {
    let load = ConfigLoader::new()
        .load_with_env(EnvConfig::default())
        .unwrap();

    assert!(load.config.database.url.is_none());
    assert!(load.config.jellyfin.is_none());
    let messages: Vec<&str> =
        load.warnings.iter().map(|w| w.message.as_str()).collect();
    assert!(messages.iter().any(|m| m.contains("No curator.toml")));
    assert!(messages.iter().any(|m| m.contains("in-memory stores")));
    assert!(messages.iter().any(|m| m.contains("Jellyfin not configured")));
}
