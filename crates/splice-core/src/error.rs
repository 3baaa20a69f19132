use std::path::PathBuf;
use thiserror::Error;

/// Core error type for workspace and manifest loading.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration at {path}: {detail}")]
    ConfigInvalid { path: PathBuf, detail: String },

    #[error("Workspace root not found from {start} (no splice.json in any ancestor)")]
    WorkspaceNotFound { start: PathBuf },

    #[error("Duplicate project name '{name}' declared at {first} and {second}")]
    DuplicateProject {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    #[must_use]
    pub fn invalid(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
