//! Application-level errors.

use crate::collab::CollabError;
use kra_review_core::ReviewError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the CLI and session layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Collab(#[from] CollabError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("review '{0}' not found")]
    ReviewNotFound(String),

    /// Bad command-line input (unknown field, unparsable value, ...).
    #[error("{0}")]
    Usage(String),
}
