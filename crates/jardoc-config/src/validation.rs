use crate::{parse_listen_addr, JardocConfig, LoggingConfig};

/// A setting that makes the config unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("{toml_path}: {message}")]
    InvalidValue { toml_path: String, message: String },
}

/// A setting that is suspicious but has a usable fallback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigWarning {
    #[error("logging.level {value:?} is not a valid filter; falling back to {normalized:?}")]
    LoggingLevelInvalid { value: String, normalized: String },

    #[error("versions.exclude lists {version:?} more than once")]
    DuplicateExclusion { version: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationDiagnostics {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigWarning>,
}

impl ValidationDiagnostics {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, toml_path: &str, message: impl Into<String>) {
        self.errors.push(ConfigValidationError::InvalidValue {
            toml_path: toml_path.to_owned(),
            message: message.into(),
        });
    }
}

impl JardocConfig {
    /// Check semantic invariants, reporting every problem found in one pass.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();

        validate_server(self, &mut out);
        validate_repository(self, &mut out);
        validate_project(self, &mut out);
        validate_versions(self, &mut out);
        validate_cache(self, &mut out);
        validate_logging(self, &mut out);

        out
    }
}

fn validate_server(config: &JardocConfig, out: &mut ValidationDiagnostics) {
    if let Err(err) = parse_listen_addr(&config.server.listen) {
        out.error("server.listen", err.to_string());
    }
    if config.server.fetch_timeout_ms == 0 {
        out.error("server.fetch_timeout_ms", "must be >= 1");
    }
}

fn validate_repository(config: &JardocConfig, out: &mut ValidationDiagnostics) {
    match config.repository.url() {
        Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
            out.error(
                "repository.url",
                format!("unsupported scheme {:?}; expected http or https", url.scheme()),
            );
        }
        Ok(_) => {}
        Err(err) => out.error("repository.url", err.to_string()),
    }
    if config.repository.request_timeout_ms == 0 {
        out.error("repository.request_timeout_ms", "must be >= 1");
    }
    if config.repository.max_artifact_bytes == 0 {
        out.error("repository.max_artifact_bytes", "must be >= 1");
    }
}

fn validate_project(config: &JardocConfig, out: &mut ValidationDiagnostics) {
    let project = &config.project;
    for (toml_path, value) in [
        ("project.group_id", &project.group_id),
        ("project.artifact_id", &project.artifact_id),
    ] {
        if value.trim().is_empty() {
            out.error(toml_path, "must not be empty");
        } else if value.contains(':') || value.contains('/') {
            out.error(toml_path, "must not contain ':' or '/'");
        }
    }
}

fn validate_versions(config: &JardocConfig, out: &mut ValidationDiagnostics) {
    let mut seen = std::collections::HashSet::new();
    for version in &config.versions.exclude {
        if !seen.insert(version.as_str()) {
            out.warnings.push(ConfigWarning::DuplicateExclusion {
                version: version.clone(),
            });
        }
    }

    for alias in &config.versions.legacy_aliases {
        if alias.trim().is_empty() {
            out.error("versions.legacy_aliases", "aliases must not be empty");
        } else if alias.contains('/') {
            out.error(
                "versions.legacy_aliases",
                format!("alias {alias:?} must be a single path segment"),
            );
        }
    }
}

fn validate_cache(config: &JardocConfig, out: &mut ValidationDiagnostics) {
    let cache = &config.cache;
    if cache.snapshot_ttl_secs == 0 {
        out.error("cache.snapshot_ttl_secs", "must be >= 1");
    }
    if cache.release_ttl_secs == 0 {
        out.error("cache.release_ttl_secs", "must be >= 1");
    }
    if cache.max_bytes == 0 {
        out.error("cache.max_bytes", "must be >= 1");
    }
    if cache.refresh_interval_secs == Some(0) {
        out.error("cache.refresh_interval_secs", "must be >= 1");
    }
}

fn validate_logging(config: &JardocConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&config.logging.level);
    if !config.logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: config.logging.level.clone(),
            normalized,
        });
    }
}
