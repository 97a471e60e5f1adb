use std::collections::HashSet;

use jardoc_maven::{Coordinate, Repository, RepositoryError};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Inner {
    /// Oldest first, as the repository lists them.
    versions: Vec<Coordinate>,
    excluded: HashSet<String>,
}

/// Known versions of the tracked project, plus versions that must never be picked as
/// "latest". Excluded versions stay reachable by their exact version string.
#[derive(Debug, Default)]
pub struct VersionSet {
    inner: RwLock<Inner>,
}

impl VersionSet {
    pub fn new(excluded: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                versions: Vec::new(),
                excluded: excluded.into_iter().collect(),
            }),
        }
    }

    /// Swap in a new version list wholesale.
    pub fn replace(&self, versions: Vec<Coordinate>) {
        self.inner.write().versions = versions;
    }

    /// Returns `false` if the version was already excluded.
    pub fn exclude(&self, version: impl Into<String>) -> bool {
        self.inner.write().excluded.insert(version.into())
    }

    /// Returns `false` if the version was not excluded.
    pub fn include(&self, version: &str) -> bool {
        self.inner.write().excluded.remove(version)
    }

    pub fn is_excluded(&self, version: &str) -> bool {
        self.inner.read().excluded.contains(version)
    }

    pub fn len(&self) -> usize {
        self.inner.read().versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().versions.is_empty()
    }

    pub fn versions(&self) -> Vec<Coordinate> {
        self.inner.read().versions.clone()
    }

    /// Exact match on the version string.
    pub fn find(&self, version: &str) -> Option<Coordinate> {
        self.inner
            .read()
            .versions
            .iter()
            .find(|c| c.version == version)
            .cloned()
    }

    /// Newest version that is neither a snapshot nor excluded.
    pub fn latest(&self) -> Option<Coordinate> {
        let inner = self.inner.read();
        inner
            .versions
            .iter()
            .rev()
            .find(|c| !c.is_snapshot() && !inner.excluded.contains(&c.version))
            .cloned()
    }

    /// Re-list versions from `repository`. The network call happens before the lock is
    /// taken; on error the current list is left untouched.
    pub async fn refresh(
        &self,
        repository: &dyn Repository,
        project: &Coordinate,
    ) -> Result<usize, RepositoryError> {
        let versions = repository.list_versions(project).await?;
        let count = versions.len();
        self.replace(versions);
        Ok(count)
    }
}
