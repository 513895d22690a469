//! Typed errors at the library seam.
//!
//! The engine and its workers return [`EngineError`] so callers can match on
//! the failure kind; the CLI layer wraps these in `anyhow` for display.

use std::path::PathBuf;

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The application has no `profiles.ini`. Not fatal for discovery, which
    /// treats it as "no profiles"; fatal anywhere else.
    #[error("profile registry not found: {0}")]
    RegistryMissing(PathBuf),

    /// The archive contains no top-level directory to restore from.
    #[error("no profile folder found in the backup archive")]
    NoProfileFolderFound,

    /// A targeted process survived both the graceful and the forceful phase.
    #[error("{0} is still running; close it manually and retry")]
    ProcessStillRunning(String),

    /// Another backup or restore already holds the operation lock.
    #[error("another operation is already in progress")]
    OperationAlreadyInProgress,

    /// The operation observed its cancellation flag and stopped.
    #[error("operation cancelled")]
    Cancelled,

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<std::io::Error>() {
            Ok(io) => EngineError::Io(io),
            Err(other) => EngineError::Other(format!("{:#}", other)),
        }
    }
}
