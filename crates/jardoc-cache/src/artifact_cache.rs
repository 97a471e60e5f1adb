use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jardoc_archive::VirtualFileSystem;
use jardoc_maven::{Coordinate, Repository};
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use crate::error::Result;

/// Upper bound applied to TTLs before they are added to an `Instant`.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Freshness and size limits for an [`ArtifactCache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long a `-SNAPSHOT` artifact is served before it is fetched again.
    pub snapshot_ttl: Duration,
    /// Validity advertised for release artifacts, which never change.
    pub release_ttl: Duration,
    /// Total archive bytes retained before least-recently-used entries are dropped.
    pub max_bytes: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            snapshot_ttl: Duration::from_secs(60),
            release_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            max_bytes: 512 * 1024 * 1024,
        }
    }
}

/// One fetched and indexed archive.
#[derive(Debug)]
pub struct ArtifactCacheEntry {
    fs: VirtualFileSystem,
    coordinate: Coordinate,
    size_bytes: u64,
    cached_at: Instant,
    last_accessed: Mutex<Instant>,
}

impl ArtifactCacheEntry {
    fn new(coordinate: Coordinate, fs: VirtualFileSystem, cached_at: Instant) -> Self {
        Self {
            size_bytes: fs.archive_len() as u64,
            fs,
            coordinate,
            cached_at,
            last_accessed: Mutex::new(cached_at),
        }
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn cached_at(&self) -> Instant {
        self.cached_at
    }

    pub fn last_accessed(&self) -> Instant {
        *self.last_accessed.lock()
    }

    fn touch(&self, now: Instant) {
        let mut last = self.last_accessed.lock();
        if now > *last {
            *last = now;
        }
    }
}

/// What a lookup hands to a request: an independent handle on the archive tree plus the
/// moment it stops being fresh. Eviction never invalidates a `CachedArtifact` already
/// handed out.
#[derive(Clone, Debug)]
pub struct CachedArtifact {
    pub fs: VirtualFileSystem,
    pub valid_until: Instant,
}

/// In-memory map from coordinate to indexed archive.
///
/// Lookups share a read lock. Fetching and indexing happen with no lock held, so two
/// concurrent misses for the same coordinate both fetch and the later insert wins.
pub struct ArtifactCache {
    repository: Arc<dyn Repository>,
    policy: CachePolicy,
    entries: RwLock<HashMap<Coordinate, Arc<ArtifactCacheEntry>>>,
}

impl ArtifactCache {
    pub fn new(repository: Arc<dyn Repository>, policy: CachePolicy) -> Self {
        Self {
            repository,
            policy,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        self.entries.read().contains_key(coordinate)
    }

    pub fn entry(&self, coordinate: &Coordinate) -> Option<Arc<ArtifactCacheEntry>> {
        self.entries.read().get(coordinate).cloned()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.read().values().map(|e| e.size_bytes).sum()
    }

    /// Return the cached archive for `coordinate`, fetching and indexing it when it is
    /// absent or stale.
    pub async fn get_or_fetch(&self, coordinate: &Coordinate) -> Result<CachedArtifact> {
        if let Some(hit) = self.lookup(coordinate, Instant::now()) {
            tracing::trace!(target = "jardoc.cache", %coordinate, "cache hit");
            return Ok(hit);
        }

        tracing::debug!(target = "jardoc.cache", %coordinate, "cache miss; fetching");
        let artifact = self.repository.resolve(coordinate).await?;
        let bytes = self.repository.fetch(&artifact).await?;
        let fs =
            tokio::task::spawn_blocking(move || VirtualFileSystem::from_bytes(bytes)).await??;

        let cached_at = Instant::now();
        let entry = Arc::new(ArtifactCacheEntry::new(coordinate.clone(), fs, cached_at));
        let hit = CachedArtifact {
            fs: entry.fs.clone(),
            valid_until: self.valid_until(&entry, cached_at),
        };
        tracing::info!(
            target = "jardoc.cache",
            %coordinate,
            url = %artifact.url,
            bytes = entry.size_bytes,
            files = entry.fs.file_count(),
            "cached artifact"
        );

        let mut entries = self.entries.write();
        entries.insert(coordinate.clone(), entry);
        self.evict_locked(&mut entries);
        Ok(hit)
    }

    fn lookup(&self, coordinate: &Coordinate, now: Instant) -> Option<CachedArtifact> {
        let entries = self.entries.read();
        let entry = entries.get(coordinate)?;
        let valid_until = self.valid_until(entry, now);
        if now >= valid_until {
            return None;
        }
        entry.touch(now);
        Some(CachedArtifact {
            fs: entry.fs.clone(),
            valid_until,
        })
    }

    /// Snapshots go stale a fixed time after they were cached; releases are always
    /// valid for another `release_ttl` from `now`.
    fn valid_until(&self, entry: &ArtifactCacheEntry, now: Instant) -> Instant {
        if entry.coordinate.is_snapshot() {
            entry.cached_at + self.policy.snapshot_ttl.min(MAX_TTL)
        } else {
            now + self.policy.release_ttl.min(MAX_TTL)
        }
    }

    /// Drop snapshot entries cached more than `snapshot_ttl` ago. Returns how many were
    /// removed.
    pub fn expire_snapshots(&self) -> usize {
        let now = Instant::now();
        let ttl = self.policy.snapshot_ttl.min(MAX_TTL);
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|coordinate, entry| {
            let keep = !coordinate.is_snapshot() || now < entry.cached_at + ttl;
            if !keep {
                tracing::info!(target = "jardoc.cache", %coordinate, "expiring snapshot");
            }
            keep
        });
        before - entries.len()
    }

    /// Walk entries from most to least recently used; once the running size passes
    /// the budget, that entry and everything older goes. The most recent entry is
    /// always kept.
    fn evict_locked(&self, entries: &mut HashMap<Coordinate, Arc<ArtifactCacheEntry>>) {
        let mut by_recency: Vec<(Coordinate, Instant, Instant, u64)> = entries
            .iter()
            .map(|(coordinate, entry)| {
                (
                    coordinate.clone(),
                    entry.last_accessed(),
                    entry.cached_at,
                    entry.size_bytes,
                )
            })
            .collect();
        by_recency.sort_by_key(|(_, accessed, cached, _)| Reverse((*accessed, *cached)));

        let mut running = 0u64;
        let cutoff = by_recency.iter().position(|(_, _, _, size)| {
            running = running.saturating_add(*size);
            running > self.policy.max_bytes
        });
        let Some(cutoff) = cutoff.map(|idx| idx.max(1)) else {
            return;
        };
        if cutoff >= by_recency.len() {
            return;
        }

        for (coordinate, ..) in &by_recency[cutoff..] {
            entries.remove(coordinate);
        }
        let retained: u64 = entries.values().map(|e| e.size_bytes).sum();
        tracing::info!(
            target = "jardoc.cache",
            evicted = by_recency.len() - cutoff,
            retained_entries = entries.len(),
            retained_bytes = retained,
            budget = self.policy.max_bytes,
            "evicted least recently used artifacts"
        );
    }
}

impl std::fmt::Debug for ArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("policy", &self.policy)
            .field("entries", &self.len())
            .finish()
    }
}
