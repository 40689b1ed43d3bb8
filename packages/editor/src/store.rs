//! Flat block storage with top-level ordering.

use crate::block::{Block, BlockId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct BlockStore {
    blocks: HashMap<BlockId, Block>,

    /// Top-level blocks in document order
    order: Vec<BlockId>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn get_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    /// Position of a top-level block
    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.order.iter().position(|b| b == id)
    }

    /// Nested blocks owned by `parent`, sorted by id for stable output
    pub fn children_of(&self, parent: &BlockId) -> Vec<&Block> {
        let mut children: Vec<&Block> = self
            .blocks
            .values()
            .filter(|b| b.parent.as_ref() == Some(parent))
            .collect();
        children.sort_by(|a, b| a.id.cmp(&b.id));
        children
    }

    pub(crate) fn insert(&mut self, block: Block, index: Option<usize>) {
        if block.parent.is_none() {
            let at = index.unwrap_or(self.order.len()).min(self.order.len());
            self.order.insert(at, block.id.clone());
        }
        self.blocks.insert(block.id.clone(), block);
    }

    pub(crate) fn remove(&mut self, id: &BlockId) -> Option<(Block, Option<usize>)> {
        let block = self.blocks.remove(id)?;
        let index = self.index_of(id);
        if let Some(at) = index {
            self.order.remove(at);
        }
        Some((block, index))
    }

    /// All blocks, top-level first (in order) then nested ones by id
    pub fn snapshot(&self) -> Vec<Block> {
        let mut out: Vec<Block> = self
            .order
            .iter()
            .filter_map(|id| self.blocks.get(id).cloned())
            .collect();
        let mut nested: Vec<&Block> = self.blocks.values().filter(|b| b.parent.is_some()).collect();
        nested.sort_by(|a, b| a.id.cmp(&b.id));
        out.extend(nested.into_iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_top_level_respects_index() {
        let mut store = BlockStore::new();
        store.insert(Block::paragraph("a".into(), ""), None);
        store.insert(Block::paragraph("b".into(), ""), None);
        store.insert(Block::paragraph("c".into(), ""), Some(1));

        let ids: Vec<&str> = store.order().iter().map(BlockId::as_str).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_nested_blocks_are_not_ordered() {
        let mut store = BlockStore::new();
        store.insert(Block::new("t".into(), "table", serde_json::Value::Null), None);
        store.insert(Block::paragraph("p".into(), "").with_parent("t".into()), Some(0));

        assert_eq!(store.order().len(), 1);
        assert_eq!(store.children_of(&"t".into()).len(), 1);
    }

    #[test]
    fn test_remove_reports_index() {
        let mut store = BlockStore::new();
        store.insert(Block::paragraph("a".into(), ""), None);
        store.insert(Block::paragraph("b".into(), ""), None);

        let (block, index) = store.remove(&"b".into()).unwrap();
        assert_eq!(block.id.as_str(), "b");
        assert_eq!(index, Some(1));
        assert!(store.remove(&"b".into()).is_none());
    }
}
