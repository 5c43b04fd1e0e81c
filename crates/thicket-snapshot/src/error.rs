//! Errors raised while persisting or exporting a view

use thicket_core::GraphError;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary encoding failed: {0}")]
    Binary(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("snapshot format {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("malformed snapshot: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
