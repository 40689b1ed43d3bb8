//! Error types for the editor

use crate::block::BlockId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Operation error: {0}")]
    Op(#[from] crate::mutations::OpError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[cfg(feature = "collaboration")]
    #[error("CRDT error: {0}")]
    Crdt(String),
}
