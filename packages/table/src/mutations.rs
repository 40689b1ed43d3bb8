//! # Structural Mutations
//!
//! Every change to a table's shape or cell membership is a [`TableMutation`].
//! A mutation runs inside one document transaction: it creates and removes
//! cell blocks through the transaction, edits a working copy of the grid,
//! and finally writes the grid back into the table block's data. The caller
//! swaps the working copy in only after the transaction commits, so a
//! failed mutation leaves both the document and the live grid untouched.
//!
//! Indices come from UI state; out-of-range requests are [`Applied::Noop`],
//! not errors.

use crate::config::TableConfig;
use crate::error::{TableError, TableResult};
use crate::model::{BlockRef, Cell, CellAddr, CellContent, CellRange, Grid};
use serde::{Deserialize, Serialize};
use tablekit_editor::{paragraph_data, Block, BlockId, Caret, Transaction};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Position {
    Before,
    After,
}

impl Position {
    fn resolve(self, index: usize) -> usize {
        match self {
            Position::Before => index,
            Position::After => index + 1,
        }
    }
}

/// Structural mutation of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TableMutation {
    /// Insert a row of empty cells next to `index`
    InsertRow { index: usize, position: Position },

    /// Remove a row
    ///
    /// `withHeadings` marks whatever row is first, so deleting the heading
    /// row leaves the flag set and the next row becomes the heading.
    DeleteRow { index: usize },

    /// Insert a column of empty cells next to `index`
    ///
    /// `width` overrides the computed width when column widths are set.
    #[serde(rename_all = "camelCase")]
    InsertColumn {
        index: usize,
        position: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f64>,
    },

    /// Remove a column; `withHeadingColumn` moves to the new first column
    /// the same way
    DeleteColumn { index: usize },

    /// Reduce every cell in range to one empty block with no colors
    ClearRange { range: CellRange },

    #[serde(rename_all = "camelCase")]
    SetRangeColor {
        range: CellRange,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        text_color: Option<String>,
    },

    /// Write a matrix of cells starting at (`row`, `col`), growing the grid
    /// when the matrix overflows it
    PasteRange {
        row: usize,
        col: usize,
        cells: Vec<Vec<CellContent>>,
    },

    /// New empty block in a cell, after `after` or at the end
    InsertCellBlock {
        row: usize,
        col: usize,
        #[serde(default)]
        after: Option<BlockId>,
    },

    /// Remove a block from its cell; the last block is replaced, not removed
    RemoveCellBlock { block: BlockId },

    /// Replace column widths; `None` switches to proportional layout
    SetColumnWidths { widths: Option<Vec<f64>> },

    #[serde(rename_all = "camelCase")]
    SetHeadings {
        #[serde(default)]
        with_headings: Option<bool>,
        #[serde(default)]
        with_heading_column: Option<bool>,
    },
}

/// Outcome of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Noop,
}

impl Applied {
    pub fn is_changed(self) -> bool {
        self == Applied::Changed
    }
}

impl TableMutation {
    pub fn name(&self) -> &'static str {
        match self {
            TableMutation::InsertRow { .. } => "insertRow",
            TableMutation::DeleteRow { .. } => "deleteRow",
            TableMutation::InsertColumn { .. } => "insertColumn",
            TableMutation::DeleteColumn { .. } => "deleteColumn",
            TableMutation::ClearRange { .. } => "clearRange",
            TableMutation::SetRangeColor { .. } => "setRangeColor",
            TableMutation::PasteRange { .. } => "pasteRange",
            TableMutation::InsertCellBlock { .. } => "insertCellBlock",
            TableMutation::RemoveCellBlock { .. } => "removeCellBlock",
            TableMutation::SetColumnWidths { .. } => "setColumnWidths",
            TableMutation::SetHeadings { .. } => "setHeadings",
        }
    }

    /// History label of the transaction running this mutation
    pub fn label(&self) -> String {
        format!("table.{}", self.name())
    }

    /// Apply to a working grid inside an open transaction
    ///
    /// Does not write the grid back; see [`write_back`].
    pub fn apply(
        &self,
        grid: &mut Grid,
        tx: &mut Transaction<'_>,
        table: &BlockId,
        config: &TableConfig,
    ) -> TableResult<Applied> {
        match self {
            TableMutation::InsertRow { index, position } => {
                if *index >= grid.row_count() {
                    return Ok(Applied::Noop);
                }
                let at = position.resolve(*index);
                let cells = empty_cells(tx, table, grid.col_count())?;
                grid.insert_row(at, cells);
                debug!(row = at, "Inserted row");
                Ok(Applied::Changed)
            }

            TableMutation::DeleteRow { index } => {
                if *index >= grid.row_count() {
                    return Ok(Applied::Noop);
                }
                if grid.row_count() == 1 {
                    return Err(TableError::LastRow);
                }
                let removed = grid.remove_row(*index);
                remove_cells(tx, &removed)?;
                debug!(row = index, heading_moved = grid.with_headings && *index == 0, "Deleted row");
                Ok(Applied::Changed)
            }

            TableMutation::InsertColumn { index, position, width } => {
                if *index >= grid.col_count() {
                    return Ok(Applied::Noop);
                }
                let at = position.resolve(*index);
                let cells = empty_cells(tx, table, grid.row_count())?;
                grid.insert_column(at, cells);
                if let Some(widths) = grid.col_widths.as_mut() {
                    let w = width.unwrap_or_else(|| neighbour_width(widths, at, config));
                    widths.insert(at.min(widths.len()), w.max(config.min_column_width));
                }
                debug!(col = at, "Inserted column");
                Ok(Applied::Changed)
            }

            TableMutation::DeleteColumn { index } => {
                if *index >= grid.col_count() {
                    return Ok(Applied::Noop);
                }
                if grid.col_count() == 1 {
                    return Err(TableError::LastColumn);
                }
                let removed = grid.remove_column(*index);
                remove_cells(tx, &removed)?;
                if let Some(widths) = grid.col_widths.as_mut() {
                    if *index < widths.len() {
                        widths.remove(*index);
                    }
                }
                debug!(col = index, heading_moved = grid.with_heading_column && *index == 0, "Deleted column");
                Ok(Applied::Changed)
            }

            TableMutation::ClearRange { range } => {
                let Some(range) = range.clamp(grid.row_count(), grid.col_count()) else {
                    return Ok(Applied::Noop);
                };
                for addr in range.cells() {
                    clear_cell(grid, addr, tx, table)?;
                }
                debug!(cells = range.cell_count(), "Cleared range");
                Ok(Applied::Changed)
            }

            TableMutation::SetRangeColor { range, color, text_color } => {
                let Some(range) = range.clamp(grid.row_count(), grid.col_count()) else {
                    return Ok(Applied::Noop);
                };
                for addr in range.cells() {
                    if let Some(cell) = grid.cell_mut(addr) {
                        cell.color = color.clone();
                        cell.text_color = text_color.clone();
                    }
                }
                Ok(Applied::Changed)
            }

            TableMutation::PasteRange { row, col, cells } => paste(grid, *row, *col, cells, tx, table, config),

            TableMutation::InsertCellBlock { row, col, after } => {
                let addr = CellAddr::new(*row, *col);
                let Some(cell) = grid.cell(addr) else {
                    return Ok(Applied::Noop);
                };
                let at = after
                    .as_ref()
                    .and_then(|a| cell.blocks.iter().position(|b| b == a))
                    .map_or(cell.blocks.len(), |i| i + 1);

                let id = tx.insert_paragraph(table, "")?;
                if let Some(cell) = grid.cell_mut(addr) {
                    cell.blocks.insert(at, id.clone());
                }
                tx.set_caret_after(Some(Caret::start(id)));
                Ok(Applied::Changed)
            }

            TableMutation::RemoveCellBlock { block } => {
                let Some((addr, index)) = grid.locate_block(block) else {
                    return Ok(Applied::Noop);
                };
                tx.remove_block(block)?;
                let replacement = match grid.cell(addr) {
                    Some(cell) if cell.blocks.len() == 1 => Some(tx.insert_paragraph(table, "")?),
                    _ => None,
                };

                if let Some(cell) = grid.cell_mut(addr) {
                    cell.blocks.remove(index);
                    if let Some(id) = replacement {
                        cell.blocks.push(id);
                    }
                    let neighbour = &cell.blocks[index.saturating_sub(1).min(cell.blocks.len() - 1)];
                    let offset = tx.block(neighbour).map_or(0, |b| b.text().chars().count());
                    tx.set_caret_after(Some(Caret::new(neighbour.clone(), offset)));
                }
                Ok(Applied::Changed)
            }

            TableMutation::SetColumnWidths { widths } => match widths {
                Some(widths) if widths.len() != grid.col_count() => Ok(Applied::Noop),
                Some(widths) => {
                    grid.col_widths = Some(widths.iter().map(|w| w.max(config.min_column_width)).collect());
                    Ok(Applied::Changed)
                }
                None => {
                    grid.col_widths = None;
                    Ok(Applied::Changed)
                }
            },

            TableMutation::SetHeadings {
                with_headings,
                with_heading_column,
            } => {
                if let Some(flag) = with_headings {
                    grid.with_headings = *flag;
                }
                if let Some(flag) = with_heading_column {
                    grid.with_heading_column = *flag;
                }
                Ok(Applied::Changed)
            }
        }
    }
}

/// Persist a working grid into the table block
pub fn write_back(grid: &Grid, tx: &mut Transaction<'_>, table: &BlockId) -> TableResult<()> {
    tx.set_data(table, grid.to_stored().to_value()?)?;
    Ok(())
}

/// Width for a column inserted at `at`: average of its neighbours
fn neighbour_width(widths: &[f64], at: usize, config: &TableConfig) -> f64 {
    let left = at.checked_sub(1).and_then(|i| widths.get(i));
    let right = widths.get(at);
    match (left, right) {
        (Some(l), Some(r)) => (l + r) / 2.0,
        (Some(w), None) | (None, Some(w)) => *w,
        (None, None) => config.default_column_width,
    }
}

fn empty_cells(tx: &mut Transaction<'_>, table: &BlockId, count: usize) -> TableResult<Vec<Cell>> {
    (0..count)
        .map(|_| Ok(Cell::with_block(tx.insert_paragraph(table, "")?)))
        .collect()
}

fn remove_cells(tx: &mut Transaction<'_>, cells: &[Cell]) -> TableResult<()> {
    for id in cells.iter().flat_map(|c| c.blocks.iter()) {
        if tx.block(id).is_some() {
            tx.remove_block(id)?;
        }
    }
    Ok(())
}

/// Keep the first block as an empty paragraph, drop the rest and the colors
fn clear_cell(grid: &mut Grid, addr: CellAddr, tx: &mut Transaction<'_>, table: &BlockId) -> TableResult<()> {
    let Some(cell) = grid.cell_mut(addr) else {
        return Ok(());
    };

    for id in cell.blocks.drain(1..) {
        if tx.block(&id).is_some() {
            tx.remove_block(&id)?;
        }
    }

    let keep = match cell.blocks.first().and_then(|id| tx.block(id)) {
        Some(block) if block.is_paragraph() => {
            let id = block.id.clone();
            tx.set_data(&id, paragraph_data(""))?;
            id
        }
        Some(block) => {
            let id = block.id.clone();
            tx.remove_block(&id)?;
            tx.insert_paragraph(table, "")?
        }
        None => tx.insert_paragraph(table, "")?,
    };

    cell.blocks = vec![keep];
    cell.color = None;
    cell.text_color = None;
    Ok(())
}

fn paste(
    grid: &mut Grid,
    row: usize,
    col: usize,
    cells: &[Vec<CellContent>],
    tx: &mut Transaction<'_>,
    table: &BlockId,
    config: &TableConfig,
) -> TableResult<Applied> {
    let height = cells.len();
    let width = cells.iter().map(Vec::len).max().unwrap_or(0);
    if height == 0 || width == 0 || !grid.contains(CellAddr::new(row, col)) {
        return Ok(Applied::Noop);
    }

    // Grow first so the grid stays rectangular while content is written
    let extra_rows = (row + height).saturating_sub(grid.row_count());
    for _ in 0..extra_rows {
        let cells = empty_cells(tx, table, grid.col_count())?;
        grid.insert_row(grid.row_count(), cells);
    }
    let extra_cols = (col + width).saturating_sub(grid.col_count());
    for _ in 0..extra_cols {
        let at = grid.col_count();
        let cells = empty_cells(tx, table, grid.row_count())?;
        grid.insert_column(at, cells);
        if let Some(widths) = grid.col_widths.as_mut() {
            let w = widths.last().copied().unwrap_or(config.default_column_width);
            widths.push(w);
        }
    }
    if extra_rows > 0 || extra_cols > 0 {
        debug!(extra_rows, extra_cols, "Grew grid for paste");
    }

    for (r, source_row) in cells.iter().enumerate() {
        for (c, source) in source_row.iter().enumerate() {
            let addr = CellAddr::new(row + r, col + c);
            let Some(old) = grid.cell(addr).cloned() else {
                continue;
            };
            remove_cells(tx, std::slice::from_ref(&old))?;
            let cell = pasted_cell(source, tx, table)?;
            if let Some(target) = grid.cell_mut(addr) {
                *target = cell;
            }
        }
    }

    Ok(Applied::Changed)
}

/// Build a cell from pasted content with freshly created blocks
fn pasted_cell(source: &CellContent, tx: &mut Transaction<'_>, table: &BlockId) -> TableResult<Cell> {
    let mut cell = Cell::default();
    match source {
        CellContent::Text(text) => {
            for line in text.split('\n') {
                cell.blocks.push(tx.insert_paragraph(table, line)?);
            }
        }
        CellContent::Cell(data) => {
            cell.color = data.color.clone();
            cell.text_color = data.text_color.clone();
            for block_ref in &data.blocks {
                let (tool, block_data) = match block_ref {
                    BlockRef::Saved(saved) if !saved.data.is_null() => {
                        (saved.tool.clone(), saved.data.clone())
                    }
                    BlockRef::Saved(saved) => (saved.tool.clone(), paragraph_data("")),
                    BlockRef::Id(id) => match tx.block(id) {
                        Some(block) => (block.tool.clone(), block.data.clone()),
                        None => continue,
                    },
                };
                let id = tx.generate_id();
                let block = Block::new(id, tool, block_data).with_parent(table.clone());
                cell.blocks.push(tx.insert_block(block, None)?);
            }
        }
    }
    if cell.blocks.is_empty() {
        cell.blocks.push(tx.insert_paragraph(table, "")?);
    }
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TableData, TOOL_NAME};
    use tablekit_editor::{Document, Origin};

    fn setup(json: &str) -> (Document, BlockId, Grid) {
        let mut doc = Document::new();
        let table = BlockId::new("t");
        let data: TableData = serde_json::from_str(json).unwrap();
        let grid = doc
            .transact(Origin::Silent, |tx| {
                tx.insert_block(Block::new(table.clone(), TOOL_NAME, serde_json::Value::Null), None)?;
                let grid = Grid::normalize(&data, tx, &table, &TableConfig::default())?;
                write_back(&grid, tx, &table)?;
                Ok::<_, TableError>(grid)
            })
            .unwrap();
        (doc, table, grid)
    }

    fn run(doc: &mut Document, table: &BlockId, grid: &mut Grid, mutation: TableMutation) -> TableResult<Applied> {
        let mut working = grid.clone();
        let applied = doc.transact(Origin::command(mutation.label()), |tx| {
            let applied = mutation.apply(&mut working, tx, table, &TableConfig::default())?;
            write_back(&working, tx, table)?;
            Ok::<_, TableError>(applied)
        })?;
        *grid = working;
        Ok(applied)
    }

    fn texts(doc: &Document, grid: &Grid) -> Vec<Vec<String>> {
        grid.rows()
            .iter()
            .map(|row| row.iter().map(|c| c.texts(doc).join("\n")).collect())
            .collect()
    }

    #[test]
    fn test_insert_row_after() {
        let (mut doc, table, mut grid) = setup(r#"{ "content": [["a", "b"], ["c", "d"]] }"#);
        let applied = run(&mut doc, &table, &mut grid, TableMutation::InsertRow { index: 0, position: Position::After }).unwrap();

        assert_eq!(applied, Applied::Changed);
        assert_eq!(texts(&doc, &grid), vec![vec!["a", "b"], vec!["", ""], vec!["c", "d"]]);
        assert_eq!(doc.undo_levels(), 1);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let (mut doc, table, mut grid) = setup(r#"{ "content": [["a"]] }"#);
        let applied = run(&mut doc, &table, &mut grid, TableMutation::DeleteColumn { index: 4 }).unwrap();
        assert_eq!(applied, Applied::Noop);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_cannot_delete_last_row() {
        let (mut doc, table, mut grid) = setup(r#"{ "content": [["a", "b"]] }"#);
        let result = run(&mut doc, &table, &mut grid, TableMutation::DeleteRow { index: 0 });
        assert!(matches!(result, Err(TableError::LastRow)));
        assert_eq!(grid.row_count(), 1);
    }

    #[test]
    fn test_insert_column_uses_neighbour_average() {
        let (mut doc, table, mut grid) = setup(r#"{ "colWidths": [100, 200], "content": [["a", "b"]] }"#);
        run(
            &mut doc,
            &table,
            &mut grid,
            TableMutation::InsertColumn { index: 0, position: Position::After, width: None },
        )
        .unwrap();
        assert_eq!(grid.col_widths, Some(vec![100.0, 150.0, 200.0]));
    }

    #[test]
    fn test_delete_column_keeps_widths_in_sync() {
        let (mut doc, table, mut grid) = setup(
            r#"{ "withHeadingColumn": true, "colWidths": [100, 200, 300], "content": [["a", "b", "c"]] }"#,
        );
        run(&mut doc, &table, &mut grid, TableMutation::DeleteColumn { index: 0 }).unwrap();

        assert_eq!(grid.col_widths, Some(vec![200.0, 300.0]));
        assert!(grid.with_heading_column);
        assert_eq!(texts(&doc, &grid), vec![vec!["b", "c"]]);
    }

    #[test]
    fn test_clear_range_keeps_one_block() {
        let (mut doc, table, mut grid) = setup(
            r#"{ "content": [[{ "blocks": [{ "type": "paragraph", "data": { "text": "x" } }, { "type": "paragraph", "data": { "text": "y" } }], "color": "red" }, "b"]] }"#,
        );
        let range = CellRange::single(CellAddr::new(0, 0));
        run(&mut doc, &table, &mut grid, TableMutation::ClearRange { range }).unwrap();

        let cell = grid.cell(CellAddr::new(0, 0)).unwrap();
        assert_eq!(cell.blocks.len(), 1);
        assert_eq!(cell.color, None);
        assert_eq!(texts(&doc, &grid), vec![vec!["", "b"]]);
        assert_eq!(doc.children_of(&table).len(), 2);
    }

    #[test]
    fn test_remove_last_cell_block_replaces_it() {
        let (mut doc, table, mut grid) = setup(r#"{ "content": [["only"]] }"#);
        let block = grid.cell(CellAddr::new(0, 0)).unwrap().blocks[0].clone();
        run(&mut doc, &table, &mut grid, TableMutation::RemoveCellBlock { block: block.clone() }).unwrap();

        let cell = grid.cell(CellAddr::new(0, 0)).unwrap();
        assert_eq!(cell.blocks.len(), 1);
        assert_ne!(cell.blocks[0], block);
        assert!(!doc.contains(&block));
    }

    #[test]
    fn test_insert_cell_block_moves_caret() {
        let (mut doc, table, mut grid) = setup(r#"{ "content": [["a"]] }"#);
        let first = grid.cell(CellAddr::new(0, 0)).unwrap().blocks[0].clone();
        run(
            &mut doc,
            &table,
            &mut grid,
            TableMutation::InsertCellBlock { row: 0, col: 0, after: Some(first) },
        )
        .unwrap();

        let cell = grid.cell(CellAddr::new(0, 0)).unwrap();
        assert_eq!(cell.blocks.len(), 2);
        assert_eq!(doc.caret(), Some(&Caret::start(cell.blocks[1].clone())));
    }

    #[test]
    fn test_paste_extends_widths_with_last_width() {
        let (mut doc, table, mut grid) = setup(r#"{ "colWidths": [100, 120], "content": [["a", "b"]] }"#);
        let cells = vec![vec![CellContent::Text("x".into()), CellContent::Text("y".into())]];
        run(&mut doc, &table, &mut grid, TableMutation::PasteRange { row: 0, col: 1, cells }).unwrap();

        assert_eq!(grid.col_widths, Some(vec![100.0, 120.0, 120.0]));
        assert_eq!(texts(&doc, &grid), vec![vec!["a", "x", "y"]]);
    }

    #[test]
    fn test_failed_mutation_leaves_grid_untouched() {
        let (mut doc, table, mut grid) = setup(r#"{ "content": [["a"]] }"#);
        let before = grid.clone();
        let _ = run(&mut doc, &table, &mut grid, TableMutation::DeleteColumn { index: 0 });
        assert_eq!(grid, before);
    }

    #[test]
    fn test_mutation_script_format() {
        let json = r#"[
            { "type": "insertRow", "index": 0, "position": "after" },
            { "type": "setRangeColor", "range": { "minRow": 0, "minCol": 0, "maxRow": 1, "maxCol": 1 }, "color": "yellow" },
            { "type": "pasteRange", "row": 0, "col": 0, "cells": [["a", "b"]] }
        ]"#;
        let script: Vec<TableMutation> = serde_json::from_str(json).unwrap();
        assert_eq!(script.len(), 3);
        assert_eq!(script[1].name(), "setRangeColor");
    }
}
