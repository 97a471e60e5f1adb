//! Glue between [`JardocConfig`] and the runtime pieces it configures.

use std::time::Duration;

use jardoc_cache::{CachePolicy, ServiceSettings};
use jardoc_config::{JardocConfig, ProjectConfig, RepositoryConfig};
use jardoc_maven::{Coordinate, RemoteRepositoryOptions};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub listen: Option<String>,
    /// Appended to `versions.exclude`.
    pub exclude: Vec<String>,
}

pub fn apply_overrides(config: &mut JardocConfig, overrides: &Overrides) {
    if let Some(listen) = overrides.listen.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        config.server.listen = listen.to_owned();
    }
    for version in &overrides.exclude {
        if !config.versions.exclude.contains(version) {
            config.versions.exclude.push(version.clone());
        }
    }
}

pub fn project_coordinate(project: &ProjectConfig) -> Coordinate {
    Coordinate::new(
        &project.group_id,
        &project.artifact_id,
        &project.packaging,
        &project.classifier,
        "",
    )
}

pub fn repository_options(repository: &RepositoryConfig) -> RemoteRepositoryOptions {
    RemoteRepositoryOptions {
        allow_snapshots: repository.allow_snapshots,
        request_timeout: repository.request_timeout(),
        max_artifact_bytes: repository.max_artifact_bytes,
    }
}

pub fn service_settings(config: &JardocConfig) -> ServiceSettings {
    ServiceSettings {
        project: project_coordinate(&config.project),
        policy: CachePolicy {
            snapshot_ttl: config.cache.snapshot_ttl(),
            release_ttl: config.cache.release_ttl(),
            max_bytes: config.cache.max_bytes,
        },
        refresh_interval: config.cache.refresh_interval(),
        excluded_versions: config.versions.exclude.clone(),
    }
}

pub fn fetch_timeout(config: &JardocConfig) -> Duration {
    config.server.fetch_timeout()
}
