//! # Tablekit Editor
//!
//! Block document and transaction log used by block tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ tools: table, paragraph, ... (own crates)   │
//! └─────────────────────────────────────────────┘
//!                     ↓  transact(origin, |tx| ...)
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document + history                  │
//! │  - Flat block store with parent links       │
//! │  - One bracket = one undo step              │
//! │  - Caret snapshots per step                 │
//! │  - Change events for tools to re-render     │
//! └─────────────────────────────────────────────┘
//!                     ↓  (optional)
//! ┌─────────────────────────────────────────────┐
//! │ crdt: yrs mirror for peers                  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tablekit_editor::{Block, Document, Origin};
//!
//! let mut doc = Document::new();
//! let id = doc.generate_id();
//!
//! doc.transact(Origin::command("insert"), |tx| {
//!     tx.insert_block(Block::paragraph(id.clone(), "Hello"), None)
//! })?;
//!
//! doc.undo()?;
//! ```

mod block;
mod document;
mod errors;
mod mutations;
mod popover;
mod store;
mod transaction;
mod undo_stack;

#[cfg(feature = "collaboration")]
mod crdt;

pub use block::{paragraph_data, Block, BlockId, Caret, PARAGRAPH};
pub use document::{Document, HistoryOutcome};
pub use errors::EditorError;
pub use mutations::{DocumentEvent, Op, OpError};
pub use popover::{Anchor, MenuItem, MenuService, OpenPopover, PopoverId, PopoverRegistry};
pub use store::BlockStore;
pub use transaction::Transaction;
pub use undo_stack::{HistoryEntry, Origin, UndoStack};

#[cfg(feature = "collaboration")]
pub use crdt::CrdtMirror;
