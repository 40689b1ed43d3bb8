//! # Undo/Redo Stack
//!
//! Tracks committed transactions and replays them backwards or forwards.
//!
//! ## Design
//!
//! - One committed transaction is one entry, however many operations it holds
//! - Each entry keeps its inverses in undo-application order
//! - Undo replays the inverses and moves the entry to the redo stack
//! - Redo replays the original operations
//! - New entries clear the redo stack
//! - Consecutive typing in one block merges into a single entry until
//!   capturing is stopped; a structural entry stops capturing once it has
//!   been pushed, never while its bracket is still open
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! stack.push(entry);
//!
//! // Undo
//! stack.undo(&mut store)?;
//!
//! // Redo
//! stack.redo(&mut store)?;
//! ```

use crate::block::{BlockId, Caret};
use crate::mutations::{DocumentEvent, Op, OpError};
use crate::store::BlockStore;

/// Who produced a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Text typed into a block; consecutive edits merge
    Typing(BlockId),

    /// A named command (e.g. "table.deleteRow")
    Command(String),

    /// Not recorded in history (initial load, normalization)
    Silent,
}

impl Origin {
    pub fn command(name: impl Into<String>) -> Self {
        Origin::Command(name.into())
    }

    pub fn is_tracked(&self) -> bool {
        !matches!(self, Origin::Silent)
    }

    fn merges_with(&self, other: &Origin) -> bool {
        matches!((self, other), (Origin::Typing(a), Origin::Typing(b)) if a == b)
    }

    pub fn label(&self) -> &str {
        match self {
            Origin::Typing(_) => "typing",
            Origin::Command(name) => name,
            Origin::Silent => "silent",
        }
    }
}

/// A committed transaction that is undone/redone as one step
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Operations in application order
    pub ops: Vec<Op>,

    /// Inverse operations in undo-application order
    pub inverses: Vec<Op>,

    pub origin: Origin,

    /// Caret when the transaction opened
    pub caret_before: Option<Caret>,

    /// Caret once the transaction closed
    pub caret_after: Option<Caret>,
}

impl HistoryEntry {
    pub fn is_structural(&self) -> bool {
        self.ops.iter().any(Op::is_structural)
    }
}

/// Result of replaying an entry
#[derive(Debug, Clone)]
pub struct Replay {
    pub origin: Origin,

    /// Caret to restore after the replay
    pub caret: Option<Caret>,

    pub events: Vec<DocumentEvent>,
}

#[derive(Debug)]
pub struct UndoStack {
    /// Applied entries (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Undone entries (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Whether the next mergeable entry may fold into the top entry
    capturing: bool,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            capturing: false,
        }
    }

    /// Record a committed entry
    pub fn push(&mut self, entry: HistoryEntry) {
        let structural = entry.is_structural();

        match self.undo_stack.last_mut() {
            Some(top) if self.capturing && !structural && top.origin.merges_with(&entry.origin) => {
                top.ops.extend(entry.ops);
                let mut inverses = entry.inverses;
                inverses.append(&mut top.inverses);
                top.inverses = inverses;
                top.caret_after = entry.caret_after;
            }
            _ => {
                self.undo_stack.push(entry);

                if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
                    self.undo_stack.remove(0);
                }
            }
        }

        // New action invalidates future
        self.redo_stack.clear();
        self.capturing = !structural;
    }

    /// Force the next entry to start a new undo step
    pub fn stop_capturing(&mut self) {
        self.capturing = false;
    }

    /// Undo the most recent entry
    pub fn undo(&mut self, store: &mut BlockStore) -> Result<Option<Replay>, OpError> {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(None);
        };

        let events = match replay(&entry.inverses, store) {
            Ok(events) => events,
            Err(err) => {
                self.undo_stack.push(entry);
                return Err(err);
            }
        };

        let replayed = Replay {
            origin: entry.origin.clone(),
            caret: entry.caret_before.clone(),
            events,
        };
        self.redo_stack.push(entry);
        self.capturing = false;
        Ok(Some(replayed))
    }

    /// Redo the most recently undone entry
    pub fn redo(&mut self, store: &mut BlockStore) -> Result<Option<Replay>, OpError> {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(None);
        };

        let events = match replay(&entry.ops, store) {
            Ok(events) => events,
            Err(err) => {
                self.redo_stack.push(entry);
                return Err(err);
            }
        };

        let replayed = Replay {
            origin: entry.origin.clone(),
            caret: entry.caret_after.clone(),
            events,
        };
        self.undo_stack.push(entry);
        self.capturing = false;
        Ok(Some(replayed))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.capturing = false;
    }

    /// Label of the next undo step
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|entry| entry.origin.label())
    }

    /// Label of the next redo step
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|entry| entry.origin.label())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `ops` in order; on failure, revert the applied prefix
fn replay(ops: &[Op], store: &mut BlockStore) -> Result<Vec<DocumentEvent>, OpError> {
    let mut events = Vec::with_capacity(ops.len());
    let mut reverts = Vec::with_capacity(ops.len());

    for op in ops {
        let step = op
            .to_inverse(store)
            .and_then(|revert| op.apply(store).map(|event| (revert, event)));
        match step {
            Ok((revert, event)) => {
                reverts.push(revert);
                events.push(event);
            }
            Err(err) => {
                for revert in reverts.iter().rev() {
                    if let Err(e) = revert.apply(store) {
                        tracing::warn!(error = %e, "Failed to revert partial replay");
                    }
                }
                return Err(err);
            }
        }
    }

    Ok(events)
}
