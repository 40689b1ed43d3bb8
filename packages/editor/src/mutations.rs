//! # Block Operations
//!
//! The low-level operations every edit is reduced to. Tools express their
//! semantic edits (insert a table row, clear a range of cells) as a series
//! of these inside one transaction.
//!
//! ## Semantics
//!
//! - **InsertBlock**: adds a block; top-level blocks take a position in the
//!   document order, nested blocks only need their parent to exist
//! - **RemoveBlock**: removes exactly one block (nested blocks are removed
//!   by their owning tool, one by one)
//! - **SetData**: atomic replacement of a block's saved data
//!
//! Every operation can produce its inverse against the store state it is
//! about to be applied to; the history replays inverses to undo.

use crate::block::{Block, BlockId};
use crate::store::BlockStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Op {
    /// Insert a block (index applies to top-level blocks only)
    InsertBlock { block: Block, index: Option<usize> },

    /// Remove a block
    RemoveBlock { id: BlockId },

    /// Replace a block's data
    SetData { id: BlockId, data: Value },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Block already exists: {0}")]
    DuplicateBlock(BlockId),

    #[error("Parent not found: {0}")]
    ParentNotFound(BlockId),
}

/// Change notification produced by applying an operation
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    BlockAdded { id: BlockId, parent: Option<BlockId> },
    BlockRemoved { id: BlockId, parent: Option<BlockId> },
    DataChanged { id: BlockId },
}

impl DocumentEvent {
    pub fn block(&self) -> &BlockId {
        match self {
            DocumentEvent::BlockAdded { id, .. }
            | DocumentEvent::BlockRemoved { id, .. }
            | DocumentEvent::DataChanged { id } => id,
        }
    }

    /// True if the event concerns `id` itself or one of its nested blocks
    pub fn touches(&self, id: &BlockId) -> bool {
        match self {
            DocumentEvent::BlockAdded { id: b, parent } | DocumentEvent::BlockRemoved { id: b, parent } => {
                b == id || parent.as_ref() == Some(id)
            }
            DocumentEvent::DataChanged { id: b } => b == id,
        }
    }
}

impl Op {
    /// Apply to the store with validation
    pub fn apply(&self, store: &mut BlockStore) -> Result<DocumentEvent, OpError> {
        self.validate(store)?;

        match self {
            Op::InsertBlock { block, index } => {
                store.insert(block.clone(), *index);
                Ok(DocumentEvent::BlockAdded {
                    id: block.id.clone(),
                    parent: block.parent.clone(),
                })
            }

            Op::RemoveBlock { id } => {
                let (block, _) = store
                    .remove(id)
                    .ok_or_else(|| OpError::BlockNotFound(id.clone()))?;
                Ok(DocumentEvent::BlockRemoved {
                    id: block.id,
                    parent: block.parent,
                })
            }

            Op::SetData { id, data } => {
                let block = store
                    .get_mut(id)
                    .ok_or_else(|| OpError::BlockNotFound(id.clone()))?;
                block.data = data.clone();
                Ok(DocumentEvent::DataChanged { id: id.clone() })
            }
        }
    }

    /// Validate without applying
    pub fn validate(&self, store: &BlockStore) -> Result<(), OpError> {
        match self {
            Op::InsertBlock { block, .. } => {
                if store.contains(&block.id) {
                    return Err(OpError::DuplicateBlock(block.id.clone()));
                }
                if let Some(parent) = &block.parent {
                    if !store.contains(parent) {
                        return Err(OpError::ParentNotFound(parent.clone()));
                    }
                }
                Ok(())
            }

            Op::RemoveBlock { id } | Op::SetData { id, .. } => {
                if store.contains(id) {
                    Ok(())
                } else {
                    Err(OpError::BlockNotFound(id.clone()))
                }
            }
        }
    }

    /// Create the inverse operation against the current store state
    pub fn to_inverse(&self, store: &BlockStore) -> Result<Op, OpError> {
        match self {
            Op::InsertBlock { block, .. } => Ok(Op::RemoveBlock {
                id: block.id.clone(),
            }),

            Op::RemoveBlock { id } => {
                let block = store
                    .get(id)
                    .ok_or_else(|| OpError::BlockNotFound(id.clone()))?;
                Ok(Op::InsertBlock {
                    block: block.clone(),
                    index: store.index_of(id),
                })
            }

            Op::SetData { id, .. } => {
                let block = store
                    .get(id)
                    .ok_or_else(|| OpError::BlockNotFound(id.clone()))?;
                Ok(Op::SetData {
                    id: id.clone(),
                    data: block.data.clone(),
                })
            }
        }
    }

    /// Insertions and removals shift block indices; data edits do not
    pub fn is_structural(&self) -> bool {
        !matches!(self, Op::SetData { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::InsertBlock { .. } => "insertBlock",
            Op::RemoveBlock { .. } => "removeBlock",
            Op::SetData { .. } => "setData",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(ids: &[&str]) -> BlockStore {
        let mut store = BlockStore::new();
        for id in ids {
            Op::InsertBlock {
                block: Block::paragraph((*id).into(), id),
                index: None,
            }
            .apply(&mut store)
            .unwrap();
        }
        store
    }

    #[test]
    fn test_op_serialization() {
        let op = Op::RemoveBlock { id: "blk-1".into() };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"op\":\"removeBlock\""));

        let back: Op = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_remove_inverse_restores_position() {
        let mut store = store_with(&["a", "b", "c"]);
        let op = Op::RemoveBlock { id: "b".into() };

        let inverse = op.to_inverse(&store).unwrap();
        op.apply(&mut store).unwrap();
        assert_eq!(store.order().len(), 2);

        inverse.apply(&mut store).unwrap();
        let ids: Vec<&str> = store.order().iter().map(BlockId::as_str).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_validation_rejects_duplicates_and_orphans() {
        let store = store_with(&["a"]);

        let dup = Op::InsertBlock {
            block: Block::paragraph("a".into(), ""),
            index: None,
        };
        assert_eq!(dup.validate(&store), Err(OpError::DuplicateBlock("a".into())));

        let orphan = Op::InsertBlock {
            block: Block::paragraph("x".into(), "").with_parent("missing".into()),
            index: None,
        };
        assert_eq!(orphan.validate(&store), Err(OpError::ParentNotFound("missing".into())));
    }

    #[test]
    fn test_set_data_inverse_holds_previous_data() {
        let mut store = store_with(&["a"]);
        let op = Op::SetData {
            id: "a".into(),
            data: crate::block::paragraph_data("changed"),
        };
        let inverse = op.to_inverse(&store).unwrap();
        op.apply(&mut store).unwrap();
        assert_eq!(store.get(&"a".into()).unwrap().text(), "changed");

        inverse.apply(&mut store).unwrap();
        assert_eq!(store.get(&"a".into()).unwrap().text(), "a");
    }

    #[test]
    fn test_event_touches_parent() {
        let event = DocumentEvent::BlockAdded {
            id: "p".into(),
            parent: Some("t".into()),
        };
        assert!(event.touches(&"t".into()));
        assert!(event.touches(&"p".into()));
        assert!(!event.touches(&"x".into()));
    }
}
