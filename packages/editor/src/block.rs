//! # Blocks
//!
//! A block is the unit the editor mounts and edits: a paragraph, a list,
//! a table. Blocks are flat in the store; nesting is expressed through the
//! `parent` back-reference, and the owning tool decides the order of its
//! nested blocks.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Tool name of the plain rich-text block
pub const PARAGRAPH: &str = "paragraph";

/// Stable identifier of a block
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A block entity as stored in the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,

    /// Tool that renders this block (e.g. "paragraph", "table")
    #[serde(rename = "type")]
    pub tool: String,

    /// Tool-specific saved data
    #[serde(default)]
    pub data: Value,

    /// Owning block for nested blocks (table cells, columns, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<BlockId>,
}

impl Block {
    pub fn new(id: BlockId, tool: impl Into<String>, data: Value) -> Self {
        Self {
            id,
            tool: tool.into(),
            data,
            parent: None,
        }
    }

    /// Create a paragraph block holding `text`
    pub fn paragraph(id: BlockId, text: &str) -> Self {
        Self::new(id, PARAGRAPH, paragraph_data(text))
    }

    pub fn with_parent(mut self, parent: BlockId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Text content (`data.text`), empty for blocks without one
    pub fn text(&self) -> &str {
        self.data.get("text").and_then(Value::as_str).unwrap_or("")
    }

    pub fn is_paragraph(&self) -> bool {
        self.tool == PARAGRAPH
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }
}

/// Saved data of a paragraph
pub fn paragraph_data(text: &str) -> Value {
    json!({ "text": text })
}

/// Caret position inside a block (offset counted in chars)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caret {
    pub block: BlockId,
    pub offset: usize,
}

impl Caret {
    pub fn new(block: BlockId, offset: usize) -> Self {
        Self { block, offset }
    }

    pub fn start(block: BlockId) -> Self {
        Self::new(block, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_text() {
        let block = Block::paragraph(BlockId::new("a"), "Hello");
        assert_eq!(block.text(), "Hello");
        assert!(block.is_paragraph());
        assert!(!block.is_empty());
    }

    #[test]
    fn test_block_serialization_uses_type_key() {
        let block = Block::paragraph("p1".into(), "x").with_parent("t1".into());
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "paragraph");
        assert_eq!(json["parent"], "t1");

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_text_of_non_text_block_is_empty() {
        let block = Block::new("img".into(), "image", json!({ "url": "a.png" }));
        assert_eq!(block.text(), "");
    }
}
