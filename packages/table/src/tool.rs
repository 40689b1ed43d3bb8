//! # Table Tool
//!
//! One [`TableTool`] drives one table block. It owns the live grid and the
//! interaction state; the document, the block host, and the menu service are
//! passed in per call through a [`ToolContext`].
//!
//! ## Write path
//!
//! ```text
//! pointer / key / menu → controller → TableMutation(s)
//!                                         ↓
//!                        Document::transact (one bracket)
//!                          - cell blocks created/removed
//!                          - working grid edited
//!                          - table data written back
//!                                         ↓
//!                        grid swapped in, host mounts synced
//! ```
//!
//! Drags (resize, add lines) keep their state here and only open a bracket
//! when they end.

use crate::add_controls::{column_unit, AddControls, Axis};
use crate::clipboard::{self, ClipboardPayload, PasteContent};
use crate::config::TableConfig;
use crate::error::{TableError, TableResult};
use crate::grips::{GripState, MenuAction, MenuTarget};
use crate::host::{BlockHost, CellContainer, ToolContext};
use crate::keyboard::{self, CaretContext, KeyAction, KeyInput};
use crate::model::{CellAddr, Grid, TableData, TOOL_NAME};
use crate::mutations::{write_back, Applied, TableMutation};
use crate::resize::{self, ColumnResize};
use crate::selection::{PointerTarget, SelectionEngine};
use crate::view::{self, TableState, TableView};
use serde_json::Value;
use std::collections::HashMap;
use tablekit_editor::{Anchor, Block, BlockId, Caret, Document, Origin, PopoverId, Transaction};
use tracing::{debug, info, instrument};

/// What a pointer event landed on, in table coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hit {
    Cell { addr: CellAddr, target: PointerTarget },
    AddButton(Axis),
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { hit: Hit, x: f64, y: f64, shift: bool },
    Move { cell: Option<CellAddr>, x: f64, y: f64 },
    Up { x: f64, y: f64 },
    Cancel,
    /// Pointer moved without a button held; `width`/`height` are the
    /// table's rendered size
    Hover { cell: Option<CellAddr>, x: f64, y: f64, width: f64, height: f64 },
    Leave,
}

#[derive(Debug)]
pub struct TableTool {
    id: BlockId,
    config: TableConfig,
    grid: Grid,
    pub(crate) selection: SelectionEngine,
    pub(crate) grips: GripState,
    pub(crate) add: AddControls,
    pub(crate) resize: Option<ColumnResize>,
    menu: Option<(PopoverId, MenuTarget)>,
    mounted: bool,
    detached: bool,
}

impl TableTool {
    /// Attach to an existing table block, normalizing its data
    ///
    /// Normalization writes silently: it is not an undo step.
    #[instrument(skip(doc, config))]
    pub fn open(doc: &mut Document, id: BlockId, config: TableConfig) -> TableResult<Self> {
        let block = doc.block(&id).ok_or_else(|| TableError::TableNotFound(id.clone()))?;
        if block.tool != TOOL_NAME {
            return Err(TableError::NotATable(id));
        }
        let data = TableData::from_value(&block.data)?;

        let grid = doc.transact(Origin::Silent, |tx| {
            let grid = Grid::normalize(&data, tx, &id, &config)?;
            write_back(&grid, tx, &id)?;
            Ok::<_, TableError>(grid)
        })?;

        debug!(rows = grid.row_count(), cols = grid.col_count(), "Opened table");
        Ok(Self::attach(id, config, grid))
    }

    /// Insert a new table block at top-level `index` (or the end)
    #[instrument(skip(doc, data, config))]
    pub fn create(
        doc: &mut Document,
        index: Option<usize>,
        data: &TableData,
        config: TableConfig,
        origin: Origin,
    ) -> TableResult<Self> {
        let id = doc.generate_id();
        let grid = doc.transact(origin, |tx| {
            tx.insert_block(Block::new(id.clone(), TOOL_NAME, Value::Null), index)?;
            let grid = Grid::normalize(data, tx, &id, &config)?;
            write_back(&grid, tx, &id)?;
            let first = grid.cell(CellAddr::new(0, 0)).and_then(|c| c.blocks.first()).cloned();
            tx.set_caret_after(first.map(Caret::start));
            Ok::<_, TableError>(grid)
        })?;

        info!(table = %id, rows = grid.row_count(), cols = grid.col_count(), "Created table");
        Ok(Self::attach(id, config, grid))
    }

    /// Paste outside any table: a table payload becomes a new table block
    /// at `index`; anything else is left to ordinary pasting
    pub fn paste_as_new_table(
        doc: &mut Document,
        index: usize,
        html: Option<&str>,
        plain: Option<&str>,
        config: TableConfig,
    ) -> TableResult<Option<Self>> {
        let Some(PasteContent::Table(content)) = clipboard::parse(html, plain) else {
            return Ok(None);
        };
        let data = TableData {
            content,
            ..TableData::default()
        };
        Self::create(doc, Some(index), &data, config, Origin::command("table.paste")).map(Some)
    }

    fn attach(id: BlockId, config: TableConfig, grid: Grid) -> Self {
        Self {
            add: AddControls::new(&config),
            id,
            config,
            grid,
            selection: SelectionEngine::new(),
            grips: GripState::default(),
            resize: None,
            menu: None,
            mounted: false,
            detached: false,
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn grips(&self) -> &GripState {
        &self.grips
    }

    /// The table block is gone; the tool no longer acts
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn state(&self) -> TableState<'_> {
        TableState {
            block: &self.id,
            grid: &self.grid,
            selection: self.selection.range(),
            pill: self.selection.pill_anchor(),
            grips: &self.grips,
            add: &self.add,
            resize: self.resize.as_ref(),
        }
    }

    pub fn render(&self) -> TableView {
        view::render(&self.state())
    }

    /// Saved form with block data inlined
    pub fn save(&self, doc: &Document) -> TableData {
        self.grid.to_saved(doc)
    }

    // -----------------------------------------------------------------------
    // Mounting
    // -----------------------------------------------------------------------

    pub fn mount(&mut self, host: &mut dyn BlockHost) {
        mount_grid(&self.id, &self.grid, host);
        self.mounted = true;
    }

    pub fn unmount(&mut self, host: &mut dyn BlockHost) {
        for id in self.grid.block_ids() {
            host.unmount_block(id);
        }
        self.mounted = false;
    }

    /// Tear down: unmount every nested block and close our menu
    pub fn destroy(mut self, cx: &mut ToolContext<'_>) {
        self.close_menu(cx);
        self.unmount(cx.host);
        debug!(table = %self.id, "Table destroyed");
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Swap in a grid, moving host mounts to match
    pub(crate) fn replace_grid(&mut self, grid: Grid, host: &mut dyn BlockHost) {
        if self.mounted {
            let before = locations(&self.grid);
            let after = locations(&grid);
            for id in before.keys().filter(|id| !after.contains_key(*id)) {
                host.unmount_block(id);
            }
            for (id, cell) in &after {
                if before.get(id) != Some(cell) {
                    host.mount_block(
                        &CellContainer {
                            table: self.id.clone(),
                            cell: *cell,
                        },
                        id,
                    );
                }
            }
        }
        self.grid = grid;
        self.selection.clamp(self.grid.row_count(), self.grid.col_count());
        self.grips.clamp(self.grid.row_count(), self.grid.col_count());
    }

    pub(crate) fn set_grid_rebuilt(&mut self, grid: Grid, host: &mut dyn BlockHost) {
        if self.mounted {
            for id in self.grid.block_ids() {
                host.unmount_block(id);
            }
            mount_grid(&self.id, &grid, host);
        }
        self.grid = grid;
    }

    pub(crate) fn detach(&mut self, host: &mut dyn BlockHost) {
        if self.mounted {
            self.unmount(host);
        }
        self.selection.clear();
        self.resize = None;
        self.add.cancel();
        self.grips.hide();
        self.detached = true;
    }

    fn ensure_attached(&self) -> TableResult<()> {
        if self.detached {
            return Err(TableError::TableNotFound(self.id.clone()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn execute(&mut self, cx: &mut ToolContext<'_>, mutation: TableMutation) -> TableResult<Applied> {
        let label = mutation.label();
        self.execute_all(cx, std::slice::from_ref(&mutation), &label)
    }

    /// Run mutations in one transaction, recorded as one undo step
    #[instrument(skip_all, fields(table = %self.id, label))]
    pub fn execute_all(
        &mut self,
        cx: &mut ToolContext<'_>,
        mutations: &[TableMutation],
        label: &str,
    ) -> TableResult<Applied> {
        self.ensure_attached()?;

        let mut working = self.grid.clone();
        let table = &self.id;
        let config = &self.config;
        let applied = cx.doc.transact(Origin::command(label), |tx| {
            let mut changed = false;
            for mutation in mutations {
                changed |= mutation.apply(&mut working, tx, table, config)?.is_changed();
            }
            if !changed {
                return Ok::<_, TableError>(Applied::Noop);
            }
            write_back(&working, tx, table)?;
            Ok(Applied::Changed)
        })?;

        if applied.is_changed() {
            self.replace_grid(working, cx.host);
            self.focus_caret(cx);
            debug!(rows = self.grid.row_count(), cols = self.grid.col_count(), "Table updated");
        }
        Ok(applied)
    }

    // -----------------------------------------------------------------------
    // Pointer
    // -----------------------------------------------------------------------

    pub fn handle_pointer(&mut self, cx: &mut ToolContext<'_>, event: PointerEvent) -> TableResult<Applied> {
        if self.detached {
            return Ok(Applied::Noop);
        }

        match event {
            PointerEvent::Down { hit, x, y, shift } => {
                match hit {
                    Hit::Outside => {
                        self.selection.clear();
                        self.close_menu(cx);
                    }
                    Hit::AddButton(axis) => {
                        let (pos, unit) = match axis {
                            Axis::Row => (y, self.config.row_unit),
                            Axis::Column => (x, column_unit(&self.current_widths(), &self.config)),
                        };
                        self.add.press(axis, pos, unit);
                    }
                    Hit::Cell { addr, target } => {
                        self.close_menu(cx);
                        // Proportional layouts show no handles, so only fixed widths can resize
                        let handle = self.grid.col_widths.as_deref().and_then(|widths| {
                            resize::hit_test(widths, x, self.config.resize_hit_slop).map(|col| (col, widths.to_vec()))
                        });
                        match handle {
                            Some((column, widths)) => self.resize = ColumnResize::begin(column, x, widths, &self.config),
                            None => self.selection.pointer_down(addr, target, shift),
                        }
                    }
                }
                Ok(Applied::Noop)
            }

            PointerEvent::Move { cell, x, y } => {
                if let Some(resize) = self.resize.as_mut() {
                    resize.update(x);
                } else if let Some(axis) = self.add.pressed_axis() {
                    self.add.drag(axis_pos(axis, x, y), &self.config);
                } else if let Some(cell) = cell {
                    self.selection.pointer_move(cell);
                }
                Ok(Applied::Noop)
            }

            PointerEvent::Up { x, y } => {
                if let Some(mut resize) = self.resize.take() {
                    resize.update(x);
                    return match resize.finish() {
                        Some(mutation) => self.execute(cx, mutation),
                        None => Ok(Applied::Noop),
                    };
                }
                if let Some(axis) = self.add.pressed_axis() {
                    self.add.drag(axis_pos(axis, x, y), &self.config);
                    let Some(commit) = self.add.release() else {
                        return Ok(Applied::Noop);
                    };
                    debug!(axis = ?commit.axis, count = commit.count, "Adding lines");
                    let mutations = commit.mutations(&self.grid);
                    let label = match commit.axis {
                        Axis::Row => "table.addRows",
                        Axis::Column => "table.addColumns",
                    };
                    return self.execute_all(cx, &mutations, label);
                }
                self.selection.pointer_up();
                Ok(Applied::Noop)
            }

            PointerEvent::Cancel => {
                if let Some(resize) = self.resize.take() {
                    resize.cancel();
                }
                self.add.cancel();
                self.selection.pointer_cancel();
                Ok(Applied::Noop)
            }

            PointerEvent::Hover { cell, x, y, width, height } => {
                self.add.hover(x, y, width, height, &self.config);
                match cell {
                    Some(cell) => {
                        self.grips.hover(cell);
                    }
                    None => self.grips.hide(),
                }
                Ok(Applied::Noop)
            }

            PointerEvent::Leave => {
                self.add.leave();
                self.grips.hide();
                Ok(Applied::Noop)
            }
        }
    }

    fn current_widths(&self) -> Vec<f64> {
        self.grid.widths_or(self.config.default_column_width)
    }

    // -----------------------------------------------------------------------
    // Keyboard
    // -----------------------------------------------------------------------

    /// Returns true if the table handled the key
    pub fn handle_key(&mut self, cx: &mut ToolContext<'_>, input: KeyInput) -> TableResult<bool> {
        if self.detached {
            return Ok(false);
        }

        let caret = self.caret_context(cx.doc);
        let action = keyboard::resolve(
            input,
            caret.as_ref(),
            self.selection.active_range(),
            self.grid.row_count(),
            self.grid.col_count(),
        );

        match action {
            KeyAction::PassThrough => Ok(false),
            KeyAction::FocusCell(addr) => {
                self.selection.clear();
                self.focus_cell(cx, addr);
                Ok(true)
            }
            KeyAction::ClearSelection => {
                self.selection.clear();
                Ok(true)
            }
            KeyAction::ExtendSelection { direction, from } => Ok(self.selection.extend(
                direction,
                from,
                self.grid.row_count(),
                self.grid.col_count(),
            )),
            KeyAction::Mutate(mutation) => {
                let cleared = match &mutation {
                    TableMutation::ClearRange { range } => Some(*range),
                    _ => None,
                };
                self.execute(cx, mutation)?;
                if let Some(range) = cleared {
                    self.selection.clear();
                    self.focus_cell(cx, range.top_left());
                }
                Ok(true)
            }
        }
    }

    /// Where the document caret sits in this table
    pub fn caret_context(&self, doc: &Document) -> Option<CaretContext> {
        let caret = doc.caret()?;
        let (cell, _) = self.grid.locate_block(&caret.block)?;
        let len = doc.block(&caret.block).map_or(0, |b| b.text().chars().count());
        Some(CaretContext {
            cell,
            block: caret.block.clone(),
            at_start: caret.offset == 0,
            at_end: caret.offset >= len,
        })
    }

    /// Put the caret at the start of a cell's first block
    pub fn focus_cell(&self, cx: &mut ToolContext<'_>, addr: CellAddr) -> bool {
        let Some(block) = self.grid.cell(addr).and_then(|c| c.blocks.first()) else {
            return false;
        };
        let caret = Caret::start(block.clone());
        cx.host.focus(&caret);
        cx.doc.set_caret(Some(caret));
        true
    }

    fn focus_caret(&self, cx: &mut ToolContext<'_>) {
        if let Some(caret) = cx.doc.caret() {
            if self.grid.locate_block(&caret.block).is_some() {
                cx.host.focus(caret);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Clipboard
    // -----------------------------------------------------------------------

    pub fn copy(&self, doc: &Document) -> Option<ClipboardPayload> {
        let range = self.selection.active_range()?;
        Some(clipboard::copy(&self.grid, range, doc))
    }

    /// Copy, then clear the range in one undo step
    pub fn cut(&mut self, cx: &mut ToolContext<'_>) -> TableResult<Option<ClipboardPayload>> {
        let Some(range) = self.selection.active_range() else {
            return Ok(None);
        };
        let payload = clipboard::copy(&self.grid, range, cx.doc);
        self.execute(cx, TableMutation::ClearRange { range })?;
        self.selection.clear();
        Ok(Some(payload))
    }

    /// Paste at the selection or caret cell
    ///
    /// Only table payloads are handled; plain text is left to the block
    /// under the caret.
    pub fn paste(&mut self, cx: &mut ToolContext<'_>, html: Option<&str>, plain: Option<&str>) -> TableResult<Applied> {
        let Some(PasteContent::Table(cells)) = clipboard::parse(html, plain) else {
            return Ok(Applied::Noop);
        };
        let target = self
            .selection
            .active_range()
            .map(|r| r.top_left())
            .or_else(|| self.caret_context(cx.doc).map(|c| c.cell));
        let Some(target) = target else {
            return Ok(Applied::Noop);
        };

        let applied = self.execute(
            cx,
            TableMutation::PasteRange {
                row: target.row,
                col: target.col,
                cells,
            },
        )?;
        if applied.is_changed() {
            self.selection.clear();
        }
        Ok(applied)
    }

    // -----------------------------------------------------------------------
    // Menus
    // -----------------------------------------------------------------------

    pub fn open_menu(&mut self, cx: &mut ToolContext<'_>, target: MenuTarget) {
        let anchor = Anchor {
            block: self.id.clone(),
            target: target.anchor_key(),
        };
        let id = cx.menus.open(anchor, target.items(&self.grid));
        self.menu = Some((id, target));
    }

    /// Selection pill: open the range menu for the current selection
    pub fn open_selection_menu(&mut self, cx: &mut ToolContext<'_>) -> bool {
        match self.selection.active_range() {
            Some(range) => {
                self.open_menu(cx, MenuTarget::Selection(range));
                true
            }
            None => false,
        }
    }

    pub fn menu_target(&self) -> Option<MenuTarget> {
        self.menu.map(|(_, target)| target)
    }

    /// Run the chosen item of our open menu; copy/cut return the payload
    pub fn choose_menu_item(&mut self, cx: &mut ToolContext<'_>, item: &str) -> TableResult<Option<ClipboardPayload>> {
        let Some((id, target)) = self.menu.take() else {
            return Ok(None);
        };
        // Another tool's popover replaced ours
        if !cx.menus.close_popover(id) {
            return Ok(None);
        }

        match target.resolve(item, &self.grid) {
            Some(MenuAction::Mutate(mutation)) => {
                let concludes = matches!(mutation, TableMutation::ClearRange { .. });
                self.execute(cx, mutation)?;
                if concludes {
                    self.selection.clear();
                }
                Ok(None)
            }
            Some(MenuAction::Copy) => Ok(self.copy(cx.doc)),
            Some(MenuAction::Cut) => self.cut(cx),
            None => {
                debug!(item, "Unknown menu item");
                Ok(None)
            }
        }
    }

    fn close_menu(&mut self, cx: &mut ToolContext<'_>) {
        if let Some((id, _)) = self.menu.take() {
            cx.menus.close_popover(id);
        }
    }

    // -----------------------------------------------------------------------
    // Engine lifecycle
    // -----------------------------------------------------------------------

    /// The engine created a nested block after `after` (e.g. splitting a
    /// block); record it in the same cell within the engine's transaction
    ///
    /// If that transaction is later abandoned, [`TableTool::reconcile`]
    /// brings the grid and the host back in line with the document.
    pub fn block_added(
        &mut self,
        tx: &mut Transaction<'_>,
        host: &mut dyn BlockHost,
        block: &BlockId,
        after: &BlockId,
    ) -> TableResult<bool> {
        let Some((addr, index)) = self.grid.locate_block(after) else {
            return Ok(false);
        };
        if self.grid.locate_block(block).is_some() {
            return Ok(false);
        }
        let mut working = self.grid.clone();
        if let Some(cell) = working.cell_mut(addr) {
            cell.blocks.insert(index + 1, block.clone());
        }
        write_back(&working, tx, &self.id)?;
        debug!(block = %block, row = addr.row, col = addr.col, "Adopted block");
        self.replace_grid(working, host);
        Ok(true)
    }

    /// The engine removed a nested block (e.g. converting it); drop it from
    /// its cell, replacing a cell's last block with an empty paragraph
    pub fn block_removed(&mut self, tx: &mut Transaction<'_>, host: &mut dyn BlockHost, block: &BlockId) -> TableResult<bool> {
        let Some((addr, index)) = self.grid.locate_block(block) else {
            return Ok(false);
        };
        let mut working = self.grid.clone();
        if let Some(cell) = working.cell_mut(addr) {
            cell.blocks.remove(index);
            if cell.blocks.is_empty() {
                cell.blocks.push(tx.insert_paragraph(&self.id, "")?);
            }
        }
        write_back(&working, tx, &self.id)?;
        self.replace_grid(working, host);
        Ok(true)
    }

    /// Rebuild from the document if the table data changed underneath us
    ///
    /// Returns true if the grid was rebuilt or the tool detached.
    pub fn reconcile(&mut self, cx: &mut ToolContext<'_>) -> TableResult<bool> {
        if self.detached {
            return Ok(false);
        }
        let Some(block) = cx.doc.block(&self.id) else {
            debug!(table = %self.id, "Table block gone, detaching");
            self.detach(cx.host);
            return Ok(true);
        };
        let data = TableData::from_value(&block.data)?;
        let fresh = Grid::from_stored(&data, cx.doc);
        if fresh == self.grid {
            return Ok(false);
        }
        self.replace_grid(fresh, cx.host);
        Ok(true)
    }
}

/// Cell of every nested block
fn locations(grid: &Grid) -> HashMap<BlockId, CellAddr> {
    grid.rows()
        .iter()
        .enumerate()
        .flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .flat_map(move |(c, cell)| cell.blocks.iter().map(move |id| (id.clone(), CellAddr::new(r, c))))
        })
        .collect()
}

fn mount_grid(table: &BlockId, grid: &Grid, host: &mut dyn BlockHost) {
    for (r, row) in grid.rows().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let container = CellContainer {
                table: table.clone(),
                cell: CellAddr::new(r, c),
            };
            for id in &cell.blocks {
                host.mount_block(&container, id);
            }
        }
    }
}

fn axis_pos(axis: Axis, x: f64, y: f64) -> f64 {
    match axis {
        Axis::Row => y,
        Axis::Column => x,
    }
}
