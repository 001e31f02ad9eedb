use std::path::PathBuf;
use thiserror::Error;

/// Crate-level error type.
///
/// Most I/O surfaces in this tool deliberately swallow errors into defaults
/// (a missing report reads as empty, a failed shell command becomes captured
/// stderr).  `OdavlError` is for the places where that policy does not apply:
/// corrupt state the caller asked for by name, or network failure the
/// guardian must report on.
#[derive(Debug, Error)]
pub enum OdavlError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("recipe {id}: {reason}")]
    InvalidRecipe { id: String, reason: String },

    #[error("undo snapshot {0} not found")]
    SnapshotNotFound(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, OdavlError>;
