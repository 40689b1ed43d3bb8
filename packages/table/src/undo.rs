//! # Undo/Redo Integration
//!
//! Undo and redo replay a whole bracket at once, so afterwards the table
//! data may no longer match the live grid. When a replay touches the table,
//! the tool rebuilds and then restores, in order:
//!
//! 1. controllers: resize and add gestures are dropped; grips that were
//!    visible come back without a fade
//! 2. the selection overlay, clamped to the new shape
//! 3. the caret: the recorded block at a clamped offset, else the caret the
//!    user had, else a block of the edited (or selected) cell; never a
//!    block outside the table
//! 4. the scroll offset the host had before the rebuild

use crate::error::TableResult;
use crate::grips::GripState;
use crate::host::ToolContext;
use crate::model::{CellAddr, Grid, TableData};
use crate::tool::TableTool;
use tablekit_editor::{Caret, Document, HistoryOutcome};
use tracing::debug;

/// View state captured before a replay
#[derive(Debug, Clone)]
struct Snapshot {
    scroll: f64,
    caret: Option<Caret>,
    /// Cell and block index of the caret in the old grid
    caret_cell: Option<(CellAddr, usize)>,
    grips: GripState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    Undo,
    Redo,
}

impl TableTool {
    pub fn undo(&mut self, cx: &mut ToolContext<'_>) -> TableResult<Option<HistoryOutcome>> {
        self.replay(cx, Replay::Undo)
    }

    pub fn redo(&mut self, cx: &mut ToolContext<'_>) -> TableResult<Option<HistoryOutcome>> {
        self.replay(cx, Replay::Redo)
    }

    fn replay(&mut self, cx: &mut ToolContext<'_>, kind: Replay) -> TableResult<Option<HistoryOutcome>> {
        let snapshot = self.snapshot(cx);

        let outcome = match kind {
            Replay::Undo => cx.doc.undo()?,
            Replay::Redo => cx.doc.redo()?,
        };
        let Some(outcome) = outcome else {
            return Ok(None);
        };

        if self.is_detached() {
            return Ok(Some(outcome));
        }
        if outcome.touches(self.id()) {
            self.restore_after_replay(cx, &outcome, snapshot)?;
        } else if let Some(caret) = outcome
            .caret
            .as_ref()
            .filter(|c| self.grid().locate_block(&c.block).is_some())
        {
            // Text-only replay inside a cell: the grid is unchanged
            cx.host.focus(caret);
        }
        Ok(Some(outcome))
    }

    fn snapshot(&self, cx: &ToolContext<'_>) -> Snapshot {
        let caret = cx.doc.caret().cloned();
        Snapshot {
            scroll: cx.host.scroll_offset(),
            caret_cell: caret.as_ref().and_then(|c| self.grid().locate_block(&c.block)),
            caret,
            grips: *self.grips(),
        }
    }

    fn restore_after_replay(
        &mut self,
        cx: &mut ToolContext<'_>,
        outcome: &HistoryOutcome,
        snapshot: Snapshot,
    ) -> TableResult<()> {
        let Some(block) = cx.doc.block(self.id()) else {
            debug!(table = %self.id(), "Table removed by history replay");
            self.detach(cx.host);
            cx.host.set_scroll_offset(snapshot.scroll);
            return Ok(());
        };

        let data = TableData::from_value(&block.data)?;
        let grid = Grid::from_stored(&data, cx.doc);
        let edited_cell = outcome
            .caret
            .as_ref()
            .and_then(|c| self.grid().locate_block(&c.block))
            .or(snapshot.caret_cell)
            .or_else(|| self.selection.active_range().map(|r| (r.top_left(), 0)));

        // Full rebuild: every cell container is recreated
        let is_mounted = self.is_mounted();
        self.set_grid_rebuilt(grid, cx.host);
        debug!(
            rows = self.grid().row_count(),
            cols = self.grid().col_count(),
            mounted = is_mounted,
            "Rebuilt table after history replay"
        );

        let (rows, cols) = (self.grid().row_count(), self.grid().col_count());
        self.resize = None;
        self.add.cancel();
        self.grips = if snapshot.grips.is_visible() {
            snapshot.grips.restored(rows, cols)
        } else {
            GripState::default()
        };

        self.selection.clamp(rows, cols);

        match self.restore_caret(cx.doc, outcome.caret.as_ref(), snapshot.caret.as_ref(), edited_cell) {
            Some(caret) => {
                cx.host.focus(&caret);
                cx.doc.set_caret(Some(caret));
            }
            None => debug!(table = %self.id(), "No cell to restore the caret to"),
        }

        cx.host.set_scroll_offset(snapshot.scroll);
        Ok(())
    }

    /// Caret inside this table closest to where the user was
    fn restore_caret(
        &self,
        doc: &Document,
        recorded: Option<&Caret>,
        previous: Option<&Caret>,
        edited_cell: Option<(CellAddr, usize)>,
    ) -> Option<Caret> {
        let in_table = |caret: &Caret| {
            self.grid().locate_block(&caret.block).map(|_| {
                let len = doc.block(&caret.block).map_or(0, |b| b.text().chars().count());
                Caret::new(caret.block.clone(), caret.offset.min(len))
            })
        };

        if let Some(caret) = recorded.and_then(in_table).or_else(|| previous.and_then(in_table)) {
            return Some(caret);
        }

        let (cell, index) = edited_cell?;
        let grid = self.grid();
        let rows = grid.row_count().checked_sub(1)?;
        let cols = grid.col_count().checked_sub(1)?;
        let cell = grid.cell(CellAddr::new(cell.row.min(rows), cell.col.min(cols)))?;

        let block = cell
            .blocks
            .get(index.min(cell.blocks.len().saturating_sub(1)))
            .or_else(|| cell.blocks.first())?;
        debug!(block = %block, "Caret restored to a block of the same cell");
        Some(Caret::start(block.clone()))
    }
}
