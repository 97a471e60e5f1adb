use jardoc_config::{ConfigError, JardocConfig, JARDOC_LISTEN_ENV_VAR};
use pretty_assertions::assert_eq;

#[test]
fn empty_file_yields_defaults() {
    let config = JardocConfig::from_toml_str("").unwrap();
    assert_eq!(config, JardocConfig::default());
    assert_eq!(config.server.listen, "0.0.0.0:8181");
    assert_eq!(config.project.classifier, "javadoc");
    assert_eq!(config.cache.snapshot_ttl_secs, 60);
    assert_eq!(config.cache.release_ttl_secs, 2_592_000);
    assert_eq!(config.cache.max_bytes, 512 * 1024 * 1024);
    assert_eq!(config.cache.refresh_interval(), None);
    assert!(config.repository.allow_snapshots);
}

#[test]
fn sections_override_defaults() {
    let config = JardocConfig::from_toml_str(
        r#"
[server]
listen = "127.0.0.1:9000"

[repository]
url = "https://repo.example.com/releases"
allow_snapshots = false

[project]
group_id = "com.example"
artifact_id = "widgets"

[versions]
exclude = ["3.0.1-indev"]
legacy_aliases = ["api", "latest"]

[cache]
snapshot_ttl_secs = 120
refresh_interval_secs = 10

[logging]
level = "debug"
json = true
"#,
    )
    .unwrap();

    assert_eq!(config.server.listen, "127.0.0.1:9000");
    assert_eq!(config.repository.url, "https://repo.example.com/releases");
    assert_eq!(
        config.repository.url().unwrap().as_str(),
        "https://repo.example.com/releases"
    );
    assert!(!config.repository.allow_snapshots);
    assert_eq!(config.project.group_id, "com.example");
    assert_eq!(config.project.packaging, "jar");
    assert_eq!(config.versions.exclude, vec!["3.0.1-indev"]);
    assert_eq!(config.versions.legacy_aliases, vec!["api", "latest"]);
    assert_eq!(config.cache.snapshot_ttl().as_secs(), 120);
    assert_eq!(config.cache.refresh_interval().map(|d| d.as_secs()), Some(10));
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
}

#[test]
fn unknown_keys_are_rejected_without_echoing_input() {
    let err = JardocConfig::from_toml_str("[server]\nsecret_key = \"hunter2\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
    assert!(!err.to_string().contains("hunter2"), "{err}");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = JardocConfig::load_from_path(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "{err:?}");
}

#[test]
fn listen_override_applies_when_set() {
    let mut config = JardocConfig::default();
    config.apply_overrides(|key| {
        (key == JARDOC_LISTEN_ENV_VAR).then(|| "127.0.0.1:7000".to_owned())
    });
    assert_eq!(config.server.listen, "127.0.0.1:7000");

    config.apply_overrides(|_| Some("  ".to_owned()));
    assert_eq!(config.server.listen, "127.0.0.1:7000");
}

#[test]
fn bare_port_listens_on_all_interfaces() {
    let addr = jardoc_config::parse_listen_addr(":8181").unwrap();
    assert_eq!(addr.to_string(), "0.0.0.0:8181");
    assert!(jardoc_config::parse_listen_addr("not an address").is_err());
}
