//! The block-editing engine as seen by the table tool
//!
//! The engine renders nested blocks; the tool tells it which block goes
//! into which cell. [`MemoryHost`] is an in-memory engine used by the CLI
//! and tests.

use crate::model::CellAddr;
use std::collections::BTreeMap;
use tablekit_editor::{BlockId, Caret, MenuService};

/// A cell's content container
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellContainer {
    pub table: BlockId,
    pub cell: CellAddr,
}

pub trait BlockHost {
    /// Render `block` at the end of `container`
    fn mount_block(&mut self, container: &CellContainer, block: &BlockId);

    fn unmount_block(&mut self, block: &BlockId);

    /// Place the caret and give its block focus
    fn focus(&mut self, caret: &Caret);

    /// Block that has focus, if any
    fn focused(&self) -> Option<&BlockId>;

    fn scroll_offset(&self) -> f64;

    fn set_scroll_offset(&mut self, offset: f64);
}

/// Host that records mounts and focus in memory
///
/// Like a browser, it loses its scroll position when everything it shows is
/// unmounted at once.
#[derive(Debug, Default)]
pub struct MemoryHost {
    mounted: BTreeMap<BlockId, CellContainer>,
    focused: Option<BlockId>,
    scroll: f64,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mounted(&self, block: &BlockId) -> bool {
        self.mounted.contains_key(block)
    }

    pub fn container_of(&self, block: &BlockId) -> Option<&CellContainer> {
        self.mounted.get(block)
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }
}

impl BlockHost for MemoryHost {
    fn mount_block(&mut self, container: &CellContainer, block: &BlockId) {
        self.mounted.insert(block.clone(), container.clone());
    }

    fn unmount_block(&mut self, block: &BlockId) {
        self.mounted.remove(block);
        if self.focused.as_ref() == Some(block) {
            self.focused = None;
        }
        if self.mounted.is_empty() {
            self.scroll = 0.0;
        }
    }

    fn focus(&mut self, caret: &Caret) {
        if self.mounted.contains_key(&caret.block) {
            self.focused = Some(caret.block.clone());
        }
    }

    fn focused(&self) -> Option<&BlockId> {
        self.focused.as_ref()
    }

    fn scroll_offset(&self) -> f64 {
        self.scroll
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll = offset.max(0.0);
    }
}

/// Collaborators a tool call works against
pub struct ToolContext<'a> {
    pub doc: &'a mut tablekit_editor::Document,
    pub host: &'a mut dyn BlockHost,
    pub menus: &'a mut dyn MenuService,
}

impl<'a> ToolContext<'a> {
    pub fn new(
        doc: &'a mut tablekit_editor::Document,
        host: &'a mut dyn BlockHost,
        menus: &'a mut dyn MenuService,
    ) -> Self {
        Self { doc, host, menus }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(row: usize, col: usize) -> CellContainer {
        CellContainer {
            table: BlockId::new("t"),
            cell: CellAddr::new(row, col),
        }
    }

    #[test]
    fn test_focus_requires_mounted_block() {
        let mut host = MemoryHost::new();
        let block = BlockId::new("b");
        host.focus(&Caret::start(block.clone()));
        assert_eq!(host.focused(), None);

        host.mount_block(&container(0, 0), &block);
        host.focus(&Caret::start(block.clone()));
        assert_eq!(host.focused(), Some(&block));

        host.unmount_block(&block);
        assert_eq!(host.focused(), None);
    }

    #[test]
    fn test_scroll_resets_when_emptied() {
        let mut host = MemoryHost::new();
        let block = BlockId::new("b");
        host.mount_block(&container(0, 0), &block);
        host.set_scroll_offset(420.0);

        host.unmount_block(&block);
        assert_eq!(host.scroll_offset(), 0.0);
    }
}
