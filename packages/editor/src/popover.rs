//! # Popovers
//!
//! Tools ask for menus through [`MenuService`]; the editor instance owns a
//! [`PopoverRegistry`] that keeps at most one popover open. Two editors on
//! the same page own two registries and never close each other's menus.

use crate::block::BlockId;
use serde::{Deserialize, Serialize};

/// Where a popover is attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Block the popover belongs to
    pub block: BlockId,

    /// Tool-defined position key (e.g. "cell:0:2")
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
}

impl MenuItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopoverId(u64);

/// Generic "show a menu with these items" service
pub trait MenuService {
    fn open(&mut self, anchor: Anchor, items: Vec<MenuItem>) -> PopoverId;

    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Id of the popover currently shown
    fn current_id(&self) -> Option<PopoverId>;

    /// Close `id` if it is still the open popover
    ///
    /// Returns false when another popover has replaced it.
    fn close_popover(&mut self, id: PopoverId) -> bool {
        if self.current_id() != Some(id) {
            return false;
        }
        self.close();
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPopover {
    pub id: PopoverId,
    pub anchor: Anchor,
    pub items: Vec<MenuItem>,
}

/// Per-editor registry enforcing a single open popover
#[derive(Debug, Default)]
pub struct PopoverRegistry {
    next_id: u64,
    open: Option<OpenPopover>,
}

impl PopoverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&OpenPopover> {
        self.open.as_ref()
    }
}

impl MenuService for PopoverRegistry {
    fn open(&mut self, anchor: Anchor, items: Vec<MenuItem>) -> PopoverId {
        self.next_id += 1;
        let id = PopoverId(self.next_id);
        if let Some(previous) = self.open.take() {
            tracing::debug!(target = %previous.anchor.target, "Closing popover replaced by a new one");
        }
        self.open = Some(OpenPopover { id, anchor, items });
        id
    }

    fn close(&mut self) {
        self.open = None;
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn current_id(&self) -> Option<PopoverId> {
        self.open.as_ref().map(|p| p.id)
    }
}
