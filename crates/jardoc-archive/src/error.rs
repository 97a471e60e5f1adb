use std::io;

pub type Result<T> = std::result::Result<T, VfsError>;

/// Errors produced while indexing or reading an archive.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    #[error("no such file or directory: {path}")]
    NotFound { path: String },

    #[error("{path} is claimed by both a file and a directory")]
    Conflict { path: String },

    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    #[error("is a directory: {path}")]
    IsADirectory { path: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported compression method {method} for {path}")]
    UnsupportedCompression { path: String, method: String },

    #[error("corrupt archive entry {path}: {reason}")]
    CorruptEntry { path: String, reason: &'static str },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Whether the error means "nothing lives at this path" from a caller's point of view.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VfsError::NotFound { .. } | VfsError::NotADirectory { .. }
        )
    }
}

impl From<VfsError> for io::Error {
    fn from(err: VfsError) -> Self {
        let kind = match &err {
            VfsError::NotFound { .. } => io::ErrorKind::NotFound,
            VfsError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            VfsError::CorruptEntry { .. } => io::ErrorKind::InvalidData,
            VfsError::Io(inner) => inner.kind(),
            _ => io::ErrorKind::Other,
        };
        match err {
            VfsError::Io(inner) => inner,
            other => io::Error::new(kind, other),
        }
    }
}
