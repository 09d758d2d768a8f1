//! Filesystem adapter error types.

use std::io;
use thiserror::Error;

use super::types::Operation;

/// Adapter error type.
///
/// Backend failures pass through untouched in [`FsError::Backend`]; every
/// other variant is raised by the adapter itself before the backend is
/// consulted.
#[derive(Debug, Error)]
pub enum FsError {
    /// The backing store cannot express this operation.
    #[error("operation not supported: {0}")]
    Unsupported(Operation),

    /// Path argument is not valid UTF-8.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    /// Unrecognized open mode string.
    #[error("invalid open mode: {0}")]
    InvalidMode(String),

    /// No backend could be resolved at construction.
    #[error("no storage backend: {0}")]
    NoBackend(String),

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Error raised by the backing store.
    #[error(transparent)]
    Backend(#[from] io::Error),
}

impl FsError {
    /// Create an Unsupported error.
    pub fn unsupported(op: Operation) -> Self {
        Self::Unsupported(op)
    }

    /// Create a NoBackend error.
    pub fn no_backend(reason: impl Into<String>) -> Self {
        Self::NoBackend(reason.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if this is the unsupported-operation signal.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// The backend's error, if this error came from the backing store.
    pub fn backend_error(&self) -> Option<&io::Error> {
        match self {
            Self::Backend(e) => Some(e),
            _ => None,
        }
    }
}

/// Convert FsError to std::io::Error for protocol servers built on io errors.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::Unsupported(op) => io::Error::new(
                io::ErrorKind::Unsupported,
                format!("operation not supported: {op}"),
            ),
            FsError::NonUtf8Path(path) => io::Error::new(io::ErrorKind::InvalidInput, path),
            FsError::InvalidMode(mode) => io::Error::new(io::ErrorKind::InvalidInput, mode),
            FsError::NoBackend(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FsError::Config(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
            FsError::Backend(e) => e,
        }
    }
}

/// Adapter result type.
pub type FsResult<T> = Result<T, FsError>;
