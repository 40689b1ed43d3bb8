//! # Tablekit Table
//!
//! Table block tool: a grid of cells, each holding nested blocks of the
//! surrounding document.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ TableTool                                                │
//! │  controllers: selection, resize, add lines, keyboard,    │
//! │               grips + menus, clipboard                   │
//! │  undo adapter: rebuild, restore selection/caret/scroll   │
//! └──────────────────────────────────────────────────────────┘
//!              ↓ TableMutation            ↑ render() / patch()
//! ┌──────────────────────────────┐  ┌─────────────────────────┐
//! │ mutations: one transaction   │  │ view: pure render tree  │
//! │ per structural change        │  └─────────────────────────┘
//! └──────────────────────────────┘
//!              ↓
//! ┌──────────────────────────────────────────────────────────┐
//! │ model: Grid (live) ⇄ TableData (persisted)               │
//! └──────────────────────────────────────────────────────────┘
//!              ↓
//! ┌──────────────────────────────────────────────────────────┐
//! │ tablekit-editor: Document, transactions, history         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tablekit_editor::{Document, Origin, PopoverRegistry};
//! use tablekit_table::{MemoryHost, TableConfig, TableData, TableMutation, TableTool, ToolContext, Position};
//!
//! let mut doc = Document::new();
//! let mut host = MemoryHost::new();
//! let mut menus = PopoverRegistry::new();
//!
//! let mut table = TableTool::create(&mut doc, None, &TableData::default(), TableConfig::default(), Origin::command("insert"))?;
//! let mut cx = ToolContext::new(&mut doc, &mut host, &mut menus);
//! table.mount(cx.host);
//! table.execute(&mut cx, TableMutation::InsertRow { index: 0, position: Position::After })?;
//! table.undo(&mut cx)?;
//! ```

pub mod add_controls;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod grips;
pub mod host;
pub mod keyboard;
pub mod model;
pub mod mutations;
pub mod resize;
pub mod selection;
pub mod tool;
mod undo;
pub mod view;

pub use add_controls::{AddCommit, AddControls, Axis};
pub use clipboard::{ClipboardPayload, PasteContent};
pub use config::{TableConfig, DEFAULT_CONFIG_NAME};
pub use error::{TableError, TableResult};
pub use grips::{GripState, MenuAction, MenuTarget, Transition};
pub use host::{BlockHost, CellContainer, MemoryHost, ToolContext};
pub use keyboard::{Key, KeyAction, KeyInput};
pub use model::{BlockRef, Cell, CellAddr, CellContent, CellData, CellRange, Grid, SavedBlock, TableData, TOOL_NAME};
pub use mutations::{Applied, Position, TableMutation};
pub use resize::ColumnResize;
pub use selection::{Direction, PointerTarget, SelectionEngine, SelectionState};
pub use tool::{Hit, PointerEvent, TableTool};
pub use view::{render, TableState, TableView};
