//! Error types for the table tool

use tablekit_editor::{BlockId, EditorError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table block not found: {0}")]
    TableNotFound(BlockId),

    #[error("Block {0} is not a table")]
    NotATable(BlockId),

    #[error("Cannot delete the last row")]
    LastRow,

    #[error("Cannot delete the last column")]
    LastColumn,
}

pub type TableResult<T> = Result<T, TableError>;
