//! Version tracking and the in-memory artifact cache.
//!
//! [`DocService`] ties the pieces together: a [`VersionSet`] for the tracked project,
//! an [`ArtifactCache`] of indexed javadoc archives, and a background task that
//! refreshes the former and expires snapshot entries from the latter.

mod artifact_cache;
mod error;
mod refresher;
mod service;
mod versions;

pub use artifact_cache::{ArtifactCache, ArtifactCacheEntry, CachePolicy, CachedArtifact};
pub use error::{CacheError, Result};
pub use service::{DocService, ServiceSettings};
pub use versions::VersionSet;
