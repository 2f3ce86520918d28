use std::path::PathBuf;

use thiserror::Error;

use crate::library::LibraryError;

#[derive(Error, Debug)]
pub enum ExclusionError {
    #[error("{service} unavailable: {message}")]
    UpstreamUnavailable {
        service: &'static str,
        message: String,
    },

    #[error("configuration corrupt: {0}")]
    ConfigCorrupt(String),

    #[error("file I/O failed for {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("validation failed for {path}: {reason}")]
    ValidationFailure { path: PathBuf, reason: String },

    #[error("an exclusion build is already running")]
    BuildInProgress,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExclusionError {
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Errors a build recovers from locally instead of aborting.
    pub fn is_source_local(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::FileIo { .. }
        )
    }
}

impl From<LibraryError> for ExclusionError {
    fn from(err: LibraryError) -> Self {
        Self::UpstreamUnavailable {
            service: err.service(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExclusionError>;
