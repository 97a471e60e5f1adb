use std::sync::Arc;
use std::time::Duration;

use jardoc_maven::Coordinate;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::artifact_cache::ArtifactCache;
use crate::versions::VersionSet;

pub(crate) const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Half the snapshot TTL, never below one second.
pub(crate) fn default_interval(snapshot_ttl: Duration) -> Duration {
    (snapshot_ttl / 2).max(MIN_REFRESH_INTERVAL)
}

/// Re-list versions, then drop stale snapshots. A failed listing is logged and the
/// previous version list is kept.
pub(crate) async fn refresh_once(
    versions: &VersionSet,
    cache: &ArtifactCache,
    project: &Coordinate,
) {
    tracing::debug!(target = "jardoc.refresh", %project, "checking for new versions");
    match versions.refresh(cache.repository().as_ref(), project).await {
        Ok(count) => tracing::debug!(
            target = "jardoc.refresh",
            %project,
            versions = count,
            "version list refreshed"
        ),
        Err(err) => tracing::warn!(
            target = "jardoc.refresh",
            %project,
            error = %err,
            "version refresh failed; keeping previous list"
        ),
    }

    let expired = cache.expire_snapshots();
    if expired > 0 {
        tracing::info!(target = "jardoc.refresh", expired, "expired snapshot artifacts");
    }
}

pub(crate) async fn run(
    versions: Arc<VersionSet>,
    cache: Arc<ArtifactCache>,
    project: Coordinate,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        target = "jardoc.refresh",
        interval_ms = period.as_millis() as u64,
        "refresher started"
    );
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(target = "jardoc.refresh", "refresher shutting down");
                break;
            }
            _ = ticker.tick() => {
                refresh_once(&versions, &cache, &project).await;
            }
        }
    }
}
