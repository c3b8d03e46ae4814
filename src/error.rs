use std::path::PathBuf;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use thiserror::Error;

/// Failures of the outer surfaces. The calculation engine itself never fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read '{}': {source}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid query: {0}")]
    Query(#[from] QueryRejection),
    #[error("invalid request body: {0}")]
    Body(#[from] JsonRejection),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
