use std::path::Path;

use jardoc_config::{
    discover_config_path, with_config_env_lock, JardocConfig, JARDOC_CONFIG_ENV_VAR,
};
use pretty_assertions::assert_eq;

#[test]
fn explicit_path_wins() {
    with_config_env_lock(|| {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jardoc.toml"), "").unwrap();

        let found = discover_config_path(Some(Path::new("custom.toml")), dir.path());
        assert_eq!(found, Some(dir.path().join("custom.toml")));
    });
}

#[test]
fn env_var_beats_the_working_directory_file() {
    with_config_env_lock(|| {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jardoc.toml"), "").unwrap();
        std::fs::write(
            dir.path().join("other.toml"),
            "[project]\nartifact_id = \"from-env\"\n",
        )
        .unwrap();

        std::env::set_var(JARDOC_CONFIG_ENV_VAR, "other.toml");
        let loaded = JardocConfig::load(None, dir.path());
        std::env::remove_var(JARDOC_CONFIG_ENV_VAR);

        let (config, path) = loaded.unwrap();
        assert_eq!(path, Some(dir.path().join("other.toml")));
        assert_eq!(config.project.artifact_id, "from-env");
    });
}

#[test]
fn falls_back_to_working_directory_then_defaults() {
    with_config_env_lock(|| {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(discover_config_path(None, dir.path()), None);
        let (config, path) = JardocConfig::load(None, dir.path()).unwrap();
        assert_eq!(path, None);
        assert_eq!(config.project, JardocConfig::default().project);

        std::fs::write(dir.path().join("jardoc.toml"), "[cache]\nmax_bytes = 1024\n").unwrap();
        let (config, path) = JardocConfig::load(None, dir.path()).unwrap();
        assert_eq!(path, Some(dir.path().join("jardoc.toml")));
        assert_eq!(config.cache.max_bytes, 1024);
    });
}
