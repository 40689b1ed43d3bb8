//! # Transactions
//!
//! The only way to write to a [`Document`]. A transaction is opened by
//! [`Document::transact`], collects every low-level operation applied
//! through it, and closes when the closure returns:
//!
//! - `Ok`: the operations become exactly one history entry
//! - `Err`: the operations are reverted in reverse order, nothing is recorded
//!
//! The transaction borrows the document mutably, so a second bracket cannot
//! be opened (or any other write interleaved) while one is open.

use crate::block::{paragraph_data, Block, BlockId, Caret};
use crate::mutations::{DocumentEvent, Op};
use crate::{Document, EditorError};
use serde_json::Value;

pub struct Transaction<'doc> {
    doc: &'doc mut Document,
    ops: Vec<Op>,
    inverses: Vec<Op>,
    events: Vec<DocumentEvent>,
    caret_before: Option<Caret>,
    caret_after: Option<Caret>,
}

impl<'doc> Transaction<'doc> {
    pub(crate) fn new(doc: &'doc mut Document) -> Self {
        let caret_before = doc.caret().cloned();
        Self {
            doc,
            ops: Vec::new(),
            inverses: Vec::new(),
            events: Vec::new(),
            caret_before: caret_before.clone(),
            caret_after: caret_before,
        }
    }

    /// Read access to the document as modified so far
    pub fn document(&self) -> &Document {
        &*self.doc
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.doc.block(id)
    }

    /// Allocate a fresh block id
    pub fn generate_id(&mut self) -> BlockId {
        self.doc.generate_id()
    }

    /// Apply a raw operation and record it
    pub fn apply(&mut self, op: Op) -> Result<(), EditorError> {
        let inverse = op.to_inverse(self.doc.store())?;
        let event = op.apply(self.doc.store_mut())?;

        self.ops.push(op);
        self.inverses.insert(0, inverse);
        self.events.push(event);
        Ok(())
    }

    pub fn insert_block(&mut self, block: Block, index: Option<usize>) -> Result<BlockId, EditorError> {
        let id = block.id.clone();
        self.apply(Op::InsertBlock { block, index })?;
        Ok(id)
    }

    /// Insert an empty paragraph nested under `parent`
    pub fn insert_paragraph(&mut self, parent: &BlockId, text: &str) -> Result<BlockId, EditorError> {
        let id = self.generate_id();
        self.insert_block(Block::paragraph(id, text).with_parent(parent.clone()), None)
    }

    pub fn remove_block(&mut self, id: &BlockId) -> Result<Block, EditorError> {
        let block = self
            .doc
            .block(id)
            .cloned()
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        self.apply(Op::RemoveBlock { id: id.clone() })?;

        if self.caret_after.as_ref().is_some_and(|c| &c.block == id) {
            self.caret_after = None;
        }
        Ok(block)
    }

    /// Replace a block's data; identical data records nothing
    pub fn set_data(&mut self, id: &BlockId, data: Value) -> Result<(), EditorError> {
        let current = self
            .doc
            .block(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        if current.data == data {
            return Ok(());
        }
        self.apply(Op::SetData { id: id.clone(), data })
    }

    /// Replace the text of a block, keeping its other data fields
    pub fn set_text(&mut self, id: &BlockId, text: &str) -> Result<(), EditorError> {
        let current = self
            .doc
            .block(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        let data = match &current.data {
            Value::Object(map) => {
                let mut map = map.clone();
                map.insert("text".to_string(), Value::String(text.to_string()));
                Value::Object(map)
            }
            _ => paragraph_data(text),
        };
        self.set_data(id, data)
    }

    /// Caret to restore when this transaction is redone
    pub fn set_caret_after(&mut self, caret: Option<Caret>) {
        self.caret_after = caret;
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    pub(crate) fn commit(self, origin: crate::Origin) {
        let Transaction {
            doc,
            ops,
            inverses,
            events,
            caret_before,
            caret_after,
        } = self;

        doc.set_caret(caret_after.clone());
        if ops.is_empty() {
            return;
        }

        tracing::debug!(origin = origin.label(), ops = ops.len(), "Transaction committed");
        doc.record(
            crate::HistoryEntry {
                ops,
                inverses,
                origin,
                caret_before,
                caret_after,
            },
            events,
        );
    }

    pub(crate) fn rollback(self) {
        let Transaction { doc, inverses, .. } = self;
        let count = inverses.len();

        for inverse in &inverses {
            if let Err(e) = inverse.apply(doc.store_mut()) {
                tracing::warn!(error = %e, op = inverse.name(), "Rollback step failed");
            }
        }

        if count > 0 {
            tracing::debug!(ops = count, "Transaction rolled back");
        }
    }
}
