//! `jardoc.toml` loading, discovery, validation and logging setup.

mod logging;
mod validation;

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use logging::{init_tracing, LoggingConfig};
pub use validation::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};

/// Env var naming the config file to load.
pub const JARDOC_CONFIG_ENV_VAR: &str = "JARDOC_CONFIG";
/// Env var overriding `server.listen`.
pub const JARDOC_LISTEN_ENV_VAR: &str = "JARDOC_LISTEN";
/// Looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "jardoc.toml";
/// `repository.url` when the config does not set one.
pub const DEFAULT_REPOSITORY_URL: &str = "https://repo.spongepowered.org/maven/";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JardocConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub versions: VersionsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// `host:port`; a bare `:port` listens on all interfaces.
    #[serde(default = "ServerConfig::default_listen")]
    pub listen: String,

    /// Upper bound on fetching and indexing one archive for a request.
    #[serde(default = "ServerConfig::default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl ServerConfig {
    fn default_listen() -> String {
        "0.0.0.0:8181".to_owned()
    }

    fn default_fetch_timeout_ms() -> u64 {
        120_000
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_listen_addr(&self.listen)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: Self::default_listen(),
            fetch_timeout_ms: Self::default_fetch_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Root of the Maven repository. Parsed by [`RepositoryConfig::url`].
    #[serde(default = "RepositoryConfig::default_url")]
    pub url: String,

    #[serde(default = "RepositoryConfig::default_allow_snapshots")]
    pub allow_snapshots: bool,

    #[serde(default = "RepositoryConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Downloads larger than this are refused.
    #[serde(default = "RepositoryConfig::default_max_artifact_bytes")]
    pub max_artifact_bytes: u64,
}

impl RepositoryConfig {
    fn default_url() -> String {
        DEFAULT_REPOSITORY_URL.to_owned()
    }

    /// The repository root as a URL. [`JardocConfig::validate`] reports the same
    /// failure under `repository.url`.
    pub fn url(&self) -> Result<Url, ConfigError> {
        Url::parse(self.url.trim()).map_err(|err| ConfigError::RepositoryUrl {
            value: self.url.clone(),
            reason: err.to_string(),
        })
    }

    fn default_allow_snapshots() -> bool {
        true
    }

    fn default_request_timeout_ms() -> u64 {
        60_000
    }

    fn default_max_artifact_bytes() -> u64 {
        256 * 1024 * 1024
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            allow_snapshots: Self::default_allow_snapshots(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            max_artifact_bytes: Self::default_max_artifact_bytes(),
        }
    }
}

/// The project whose javadoc is served (coordinates without a version).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default = "ProjectConfig::default_group_id")]
    pub group_id: String,
    #[serde(default = "ProjectConfig::default_artifact_id")]
    pub artifact_id: String,
    #[serde(default = "ProjectConfig::default_packaging")]
    pub packaging: String,
    #[serde(default = "ProjectConfig::default_classifier")]
    pub classifier: String,
}

impl ProjectConfig {
    fn default_group_id() -> String {
        "org.spongepowered".to_owned()
    }

    fn default_artifact_id() -> String {
        "spongeapi".to_owned()
    }

    fn default_packaging() -> String {
        "jar".to_owned()
    }

    fn default_classifier() -> String {
        "javadoc".to_owned()
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            group_id: Self::default_group_id(),
            artifact_id: Self::default_artifact_id(),
            packaging: Self::default_packaging(),
            classifier: Self::default_classifier(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionsConfig {
    /// Versions never picked as "latest" (still reachable by exact version).
    #[serde(default)]
    pub exclude: Vec<String>,

    /// First path segments that redirect to the latest version, for links that
    /// predate versioned URLs.
    #[serde(default)]
    pub legacy_aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,

    #[serde(default = "CacheConfig::default_release_ttl_secs")]
    pub release_ttl_secs: u64,

    /// Total archive bytes kept in memory.
    #[serde(default = "CacheConfig::default_max_bytes")]
    pub max_bytes: u64,

    /// Defaults to half the snapshot TTL.
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
}

impl CacheConfig {
    fn default_snapshot_ttl_secs() -> u64 {
        60
    }

    fn default_release_ttl_secs() -> u64 {
        30 * 24 * 60 * 60
    }

    fn default_max_bytes() -> u64 {
        512 * 1024 * 1024
    }

    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    pub fn release_ttl(&self) -> Duration {
        Duration::from_secs(self.release_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_secs.map(Duration::from_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_secs: Self::default_snapshot_ttl_secs(),
            release_ttl_secs: Self::default_release_ttl_secs(),
            max_bytes: Self::default_max_bytes(),
            refresh_interval_secs: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid listen address {value:?}: {reason}")]
    ListenAddr { value: String, reason: String },
    #[error("invalid repository url {value:?}: {reason}")]
    RepositoryUrl { value: String, reason: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The `Display` output embeds a snippet of the input; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

/// Resolve a listen address. Accepts `host:port`, and `:port` for all interfaces.
pub fn parse_listen_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    let trimmed = value.trim();
    let candidate = if trimmed.starts_with(':') {
        format!("0.0.0.0{trimmed}")
    } else {
        trimmed.to_owned()
    };
    let invalid = |reason: String| ConfigError::ListenAddr {
        value: value.to_owned(),
        reason,
    };
    candidate
        .to_socket_addrs()
        .map_err(|err| invalid(err.to_string()))?
        .next()
        .ok_or_else(|| invalid("resolved to no addresses".to_owned()))
}

impl JardocConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Find and load the config (see [`discover_config_path`]), falling back to the
    /// defaults when there is none, then apply environment overrides.
    ///
    /// Returns the path that was loaded, if any.
    pub fn load(
        explicit: Option<&Path>,
        working_dir: &Path,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = discover_config_path(explicit, working_dir);
        let mut config = match &path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok((config, path))
    }

    /// Apply `JARDOC_LISTEN`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(listen) = lookup(JARDOC_LISTEN_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.server.listen = listen.trim().to_owned();
        }
    }
}

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

/// Run `f` while holding the config environment lock.
///
/// Tests that set [`JARDOC_CONFIG_ENV_VAR`] or [`JARDOC_LISTEN_ENV_VAR`] must wrap the
/// mutation and the discovery call in this, since the environment is process-global.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = CONFIG_ENV_LOCK
        .get_or_init(|| ReentrantMutex::new(()))
        .lock();
    f()
}

/// Locate the config file.
///
/// Search order:
/// 1) `explicit` (the `--config` flag), relative to `working_dir`
/// 2) `JARDOC_CONFIG`, relative to `working_dir`
/// 3) `jardoc.toml` in `working_dir`
///
/// An explicit path is returned even if it does not exist, so loading it reports the error.
pub fn discover_config_path(explicit: Option<&Path>, working_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(working_dir.join(path));
    }

    if let Some(value) = std::env::var_os(JARDOC_CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        return Some(working_dir.join(PathBuf::from(value)));
    }

    let candidate = working_dir.join(DEFAULT_CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}
