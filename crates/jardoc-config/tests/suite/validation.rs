use jardoc_config::{ConfigValidationError, ConfigWarning, JardocConfig};

fn error_paths(config: &JardocConfig) -> Vec<String> {
    config
        .validate()
        .errors
        .into_iter()
        .map(|err| match err {
            ConfigValidationError::InvalidValue { toml_path, .. } => toml_path,
        })
        .collect()
}

#[test]
fn defaults_are_valid() {
    let diagnostics = JardocConfig::default().validate();
    assert!(diagnostics.is_ok(), "{diagnostics:?}");
    assert!(diagnostics.warnings.is_empty(), "{diagnostics:?}");
}

#[test]
fn reports_every_invalid_setting() {
    let config = JardocConfig::from_toml_str(
        r#"
[server]
listen = "nowhere"

[repository]
url = "ftp://repo.example.com/"

[project]
group_id = ""

[versions]
legacy_aliases = [""]

[cache]
snapshot_ttl_secs = 0
max_bytes = 0
"#,
    )
    .unwrap();

    let paths = error_paths(&config);
    for expected in [
        "server.listen",
        "repository.url",
        "project.group_id",
        "versions.legacy_aliases",
        "cache.snapshot_ttl_secs",
        "cache.max_bytes",
    ] {
        assert!(paths.iter().any(|p| p == expected), "missing {expected}: {paths:?}");
    }
}

#[test]
fn questionable_settings_only_warn() {
    let mut config = JardocConfig::default();
    config.versions.exclude = vec!["1.0".into(), "1.0".into()];
    config.logging.level = "jardoc=loud".into();

    let diagnostics = config.validate();
    assert!(diagnostics.is_ok(), "{diagnostics:?}");
    assert!(diagnostics
        .warnings
        .iter()
        .any(|w| matches!(w, ConfigWarning::DuplicateExclusion { version } if version == "1.0")));
    assert!(diagnostics
        .warnings
        .iter()
        .any(|w| matches!(w, ConfigWarning::LoggingLevelInvalid { .. })));
}

#[test]
fn unparseable_repository_url_is_a_validation_error() {
    let config = JardocConfig::from_toml_str(
        r#"
[repository]
url = "not a url"
"#,
    )
    .unwrap();

    assert_eq!(error_paths(&config), vec!["repository.url".to_string()]);
    assert!(matches!(
        config.repository.url(),
        Err(jardoc_config::ConfigError::RepositoryUrl { .. })
    ));
}

#[test]
fn default_repository_url_parses() {
    let url = JardocConfig::default().repository.url().unwrap();
    assert_eq!(url.as_str(), jardoc_config::DEFAULT_REPOSITORY_URL);
}
