use std::sync::Arc;
use std::time::Duration;

use jardoc_maven::{Coordinate, Repository, RepositoryError};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::artifact_cache::{ArtifactCache, CachePolicy, CachedArtifact};
use crate::error::Result;
use crate::refresher;
use crate::versions::VersionSet;

/// How a [`DocService`] tracks its project.
#[derive(Clone, Debug)]
pub struct ServiceSettings {
    /// The documented project; its version field is ignored.
    pub project: Coordinate,
    pub policy: CachePolicy,
    /// Defaults to half of `policy.snapshot_ttl`.
    pub refresh_interval: Option<Duration>,
    pub excluded_versions: Vec<String>,
}

/// The long-lived state behind the HTTP layer: the version list, the artifact cache,
/// and the background task that keeps both fresh.
///
/// Construct with [`DocService::start`], stop with [`DocService::shutdown`].
#[derive(Debug)]
pub struct DocService {
    project: Coordinate,
    versions: Arc<VersionSet>,
    cache: Arc<ArtifactCache>,
    cancel: CancellationToken,
    refresher: Mutex<Option<JoinHandle<()>>>,
}

impl DocService {
    /// Load the initial version list (failing if the repository cannot provide one) and
    /// spawn the refresher.
    pub async fn start(
        repository: Arc<dyn Repository>,
        settings: ServiceSettings,
    ) -> std::result::Result<Arc<Self>, RepositoryError> {
        let ServiceSettings {
            project,
            policy,
            refresh_interval,
            excluded_versions,
        } = settings;

        let versions = Arc::new(VersionSet::new(excluded_versions));
        let count = versions.refresh(repository.as_ref(), &project).await?;
        tracing::info!(target = "jardoc.service", %project, versions = count, "loaded version list");

        let cache = Arc::new(ArtifactCache::new(repository, policy));
        let period = refresh_interval
            .map(|period| period.max(refresher::MIN_REFRESH_INTERVAL))
            .unwrap_or_else(|| refresher::default_interval(policy.snapshot_ttl));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(refresher::run(
            Arc::clone(&versions),
            Arc::clone(&cache),
            project.clone(),
            period,
            cancel.clone(),
        ));

        Ok(Arc::new(Self {
            project,
            versions,
            cache,
            cancel,
            refresher: Mutex::new(Some(handle)),
        }))
    }

    pub fn project(&self) -> &Coordinate {
        &self.project
    }

    pub fn versions(&self) -> &VersionSet {
        &self.versions
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Newest non-snapshot, non-excluded version.
    pub fn latest(&self) -> Option<Coordinate> {
        self.versions.latest()
    }

    pub fn find_version(&self, version: &str) -> Option<Coordinate> {
        self.versions.find(version)
    }

    pub async fn get_or_fetch(&self, coordinate: &Coordinate) -> Result<CachedArtifact> {
        self.cache.get_or_fetch(coordinate).await
    }

    /// Run one refresh cycle now, outside the regular schedule.
    pub async fn refresh_now(&self) {
        refresher::refresh_once(&self.versions, &self.cache, &self.project).await;
    }

    /// Stop the refresher and wait for it to finish. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.refresher.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::warn!(target = "jardoc.service", error = %err, "refresher task failed");
            }
        }
    }
}

impl Drop for DocService {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
