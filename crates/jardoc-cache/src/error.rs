use jardoc_archive::VfsError;
use jardoc_maven::RepositoryError;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Why an artifact could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("invalid archive: {0}")]
    Archive(#[from] VfsError),

    #[error("archive indexing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CacheError {
    /// The repository does not have the artifact.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::Repository(err) if err.is_not_found())
    }
}
