pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Failures talking to (or interpreting answers from) a Maven repository.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("invalid coordinate {input:?}: expected 3 to 5 `:`-separated segments")]
    InvalidCoordinate { input: String },

    #[error("snapshots are not resolvable from this repository ({coordinate})")]
    SnapshotsDisallowed { coordinate: String },

    #[error("snapshot {coordinate} cannot be resolved without maven-metadata.xml snapshot info")]
    MissingSnapshotMetadata { coordinate: String },

    #[error("unsupported URL scheme for {url}")]
    UnsupportedScheme { url: String },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("bad HTTP status {status} for {url}")]
    BadStatus { url: String, status: u16 },

    #[error("artifact at {url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },

    #[error("failed to parse maven metadata from {url}: {source}")]
    Xml {
        url: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("invalid repository URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl RepositoryError {
    /// The repository answered, and the answer was "no such thing".
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}
