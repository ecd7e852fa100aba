//! Error types for the local control plane's backing file.

use std::path::PathBuf;
use thiserror::Error;

/// Errors loading or saving the control plane's store.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// Reading or writing the backing file failed
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a valid store
    #[error("invalid control plane store {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ControlPlaneError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for control plane storage.
pub type Result<T> = std::result::Result<T, ControlPlaneError>;
