//! The bits of the Maven repository layout jardoc needs: coordinates, `maven-metadata.xml`,
//! and an HTTP client that turns a coordinate into archive bytes.

mod coordinate;
mod error;
mod metadata;
mod repository;

pub use coordinate::Coordinate;
pub use error::{RepositoryError, Result};
pub use metadata::{MavenMetadata, SnapshotVersion};
pub use repository::{Artifact, RemoteRepository, RemoteRepositoryOptions, Repository};
