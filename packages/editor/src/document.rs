//! # Document Handle
//!
//! A Document owns the block store, the caret, and the undo history.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Transact → Events → Undo/Redo → Save
//!   ↓        ↓         ↓          ↓         ↓
//! Blocks  History   Tools     Replay    Blocks
//! ```
//!
//! Reads are free; every write goes through [`Document::transact`], which
//! makes the bracket the unit of undo.

use crate::block::{Block, BlockId, Caret};
use crate::mutations::DocumentEvent;
use crate::store::BlockStore;
use crate::transaction::Transaction;
use crate::undo_stack::{HistoryEntry, Origin, UndoStack};
use crate::EditorError;
use tracing::{debug, instrument};

/// Editable block document
#[derive(Debug)]
pub struct Document {
    /// Current version number (increments on each committed change)
    pub version: u64,

    store: BlockStore,
    history: UndoStack,
    caret: Option<Caret>,
    next_id: u64,

    /// Events not yet drained by the host
    pending_events: Vec<DocumentEvent>,
}

/// Result of an undo/redo step
#[derive(Debug, Clone)]
pub struct HistoryOutcome {
    pub origin: Origin,

    /// Caret recorded with the replayed entry
    pub caret: Option<Caret>,

    pub events: Vec<DocumentEvent>,
}

impl HistoryOutcome {
    /// True if the replay touched `id` or one of its nested blocks
    pub fn touches(&self, id: &BlockId) -> bool {
        self.events.iter().any(|e| e.touches(id))
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_max_undo_levels(100)
    }

    pub fn with_max_undo_levels(max_levels: usize) -> Self {
        Self {
            version: 0,
            store: BlockStore::new(),
            history: UndoStack::with_max_levels(max_levels),
            caret: None,
            next_id: 0,
            pending_events: Vec::new(),
        }
    }

    /// Load saved blocks; loading is not recorded in history
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, EditorError> {
        Self::from_blocks_with_levels(blocks, 100)
    }

    pub fn from_blocks_with_levels(blocks: Vec<Block>, max_levels: usize) -> Result<Self, EditorError> {
        let mut doc = Self::with_max_undo_levels(max_levels);
        doc.transact(Origin::Silent, |tx| {
            // Parents first so nested blocks validate
            let (top, nested): (Vec<Block>, Vec<Block>) =
                blocks.into_iter().partition(|b| b.parent.is_none());
            for block in top.into_iter().chain(nested) {
                tx.insert_block(block, None)?;
            }
            Ok::<_, EditorError>(())
        })?;
        doc.pending_events.clear();
        Ok(doc)
    }

    /// Load from a JSON array of saved blocks
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Self::from_json_with_levels(json, 100)
    }

    /// Load from JSON, keeping at most `max_levels` undo steps
    pub fn from_json_with_levels(json: &str, max_levels: usize) -> Result<Self, EditorError> {
        let blocks: Vec<Block> = serde_json::from_str(json)?;
        Self::from_blocks_with_levels(blocks, max_levels)
    }

    /// Open a transaction bracket
    ///
    /// Everything `f` applies becomes one history entry. If `f` fails, the
    /// applied operations are reverted and the error is returned.
    #[instrument(skip_all, fields(origin = origin.label()))]
    pub fn transact<T, E, F>(&mut self, origin: Origin, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    {
        let mut tx = Transaction::new(self);
        match f(&mut tx) {
            Ok(value) => {
                tx.commit(origin);
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    pub(crate) fn record(&mut self, entry: HistoryEntry, events: Vec<DocumentEvent>) {
        self.version += 1;
        self.pending_events.extend(events);
        if entry.origin.is_tracked() {
            self.history.push(entry);
        }
    }

    pub fn undo(&mut self) -> Result<Option<HistoryOutcome>, EditorError> {
        let replay = self.history.undo(&mut self.store)?;
        Ok(replay.map(|r| self.finish_replay(r, "undo")))
    }

    pub fn redo(&mut self) -> Result<Option<HistoryOutcome>, EditorError> {
        let replay = self.history.redo(&mut self.store)?;
        Ok(replay.map(|r| self.finish_replay(r, "redo")))
    }

    fn finish_replay(&mut self, replay: crate::undo_stack::Replay, kind: &'static str) -> HistoryOutcome {
        debug!(kind, origin = replay.origin.label(), events = replay.events.len(), "History replayed");
        self.version += 1;
        self.caret = replay.caret.clone();
        self.pending_events.extend(replay.events.iter().cloned());
        HistoryOutcome {
            origin: replay.origin,
            caret: replay.caret,
            events: replay.events,
        }
    }

    /// Start a new undo step for the next edit
    pub fn stop_capturing(&mut self) {
        self.history.stop_capturing();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_levels(&self) -> usize {
        self.history.undo_levels()
    }

    pub fn redo_levels(&self) -> usize {
        self.history.redo_levels()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Allocate an id no block currently uses
    pub fn generate_id(&mut self) -> BlockId {
        loop {
            self.next_id += 1;
            let id = BlockId::new(format!("blk-{}", self.next_id));
            if !self.store.contains(&id) {
                return id;
            }
        }
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.store.get(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.store.contains(id)
    }

    pub fn top_level(&self) -> &[BlockId] {
        self.store.order()
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.store.index_of(id)
    }

    pub fn children_of(&self, parent: &BlockId) -> Vec<&Block> {
        self.store.children_of(parent)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn caret(&self) -> Option<&Caret> {
        self.caret.as_ref()
    }

    /// Move the caret (not an edit, not recorded)
    pub fn set_caret(&mut self, caret: Option<Caret>) {
        self.caret = caret;
    }

    pub(crate) fn store(&self) -> &BlockStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut BlockStore {
        &mut self.store
    }

    /// Saved form of every block
    pub fn save(&self) -> Vec<Block> {
        self.store.snapshot()
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string_pretty(&self.save())?)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_paragraph(text: &str) -> (Document, BlockId) {
        let mut doc = Document::new();
        let id = doc.generate_id();
        let block = Block::paragraph(id.clone(), text);
        doc.transact(Origin::Silent, |tx| tx.insert_block(block, None))
            .unwrap();
        (doc, id)
    }

    #[test]
    fn test_silent_load_is_not_undoable() {
        let (doc, _) = doc_with_paragraph("Hello");
        assert_eq!(doc.version, 1);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_bracket_records_one_entry() {
        let (mut doc, id) = doc_with_paragraph("");

        doc.transact(Origin::command("fill"), |tx| {
            tx.set_text(&id, "a")?;
            tx.insert_paragraph(&id, "nested")?;
            tx.insert_paragraph(&id, "nested 2")?;
            Ok::<_, EditorError>(())
        })
        .unwrap();

        assert_eq!(doc.undo_levels(), 1);
        assert_eq!(doc.children_of(&id).len(), 2);

        doc.undo().unwrap();
        assert_eq!(doc.children_of(&id).len(), 0);
        assert_eq!(doc.block(&id).unwrap().text(), "");
    }

    #[test]
    fn test_failed_bracket_rolls_back() {
        let (mut doc, id) = doc_with_paragraph("keep");
        let version = doc.version;

        let result = doc.transact(Origin::command("broken"), |tx| {
            tx.set_text(&id, "changed")?;
            tx.remove_block(&BlockId::new("missing"))?;
            Ok::<_, EditorError>(())
        });

        assert!(result.is_err());
        assert_eq!(doc.block(&id).unwrap().text(), "keep");
        assert_eq!(doc.version, version);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_empty_bracket_records_nothing() {
        let (mut doc, id) = doc_with_paragraph("same");
        doc.transact(Origin::command("noop"), |tx| tx.set_text(&id, "same"))
            .unwrap();
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_undo_restores_caret_before() {
        let (mut doc, id) = doc_with_paragraph("");
        doc.set_caret(Some(Caret::new(id.clone(), 0)));

        doc.transact(Origin::Typing(id.clone()), |tx| {
            tx.set_text(&id, "abc")?;
            tx.set_caret_after(Some(Caret::new(id.clone(), 3)));
            Ok::<_, EditorError>(())
        })
        .unwrap();
        assert_eq!(doc.caret().unwrap().offset, 3);

        let outcome = doc.undo().unwrap().unwrap();
        assert_eq!(outcome.caret, Some(Caret::new(id.clone(), 0)));
        assert_eq!(doc.caret().unwrap().offset, 0);

        doc.redo().unwrap();
        assert_eq!(doc.caret().unwrap().offset, 3);
    }

    #[test]
    fn test_generate_id_skips_existing() {
        let doc_json = r#"[{"id":"blk-1","type":"paragraph","data":{"text":"x"}}]"#;
        let mut doc = Document::from_json(doc_json).unwrap();
        assert_eq!(doc.generate_id().as_str(), "blk-2");
    }

    #[test]
    fn test_drain_events() {
        let (mut doc, id) = doc_with_paragraph("");
        doc.drain_events();

        doc.transact(Origin::command("edit"), |tx| tx.set_text(&id, "x"))
            .unwrap();
        let events = doc.drain_events();
        assert_eq!(events, vec![DocumentEvent::DataChanged { id }]);
        assert!(doc.drain_events().is_empty());
    }
}
