//! # Render Tree
//!
//! [`render`] builds the full view of a table from its state; it is pure and
//! can be called at any time. [`TableView::patch`] updates the parts that
//! change without a structural edit (selection, grips, add buttons, live
//! widths) in place, so a host can apply those cheaply. Any UI layer can
//! implement both entry points.

use crate::add_controls::{AddControls, Axis};
use crate::grips::{GripState, Transition};
use crate::model::{CellAddr, CellRange, Grid};
use crate::resize::ColumnResize;
use serde::Serialize;
use tablekit_editor::BlockId;

/// Everything a render reads
#[derive(Debug, Clone, Copy)]
pub struct TableState<'a> {
    pub block: &'a BlockId,
    pub grid: &'a Grid,
    pub selection: Option<CellRange>,
    pub pill: Option<CellAddr>,
    pub grips: &'a GripState,
    pub add: &'a AddControls,
    pub resize: Option<&'a ColumnResize>,
}

impl TableState<'_> {
    fn widths(&self) -> Option<Vec<f64>> {
        match self.resize {
            Some(resize) => Some(resize.widths().to_vec()),
            None => self.grid.col_widths.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub block: BlockId,
    /// Total pixel width; `None` for proportional layout
    pub width: Option<f64>,
    pub rows: Vec<RowView>,
    pub column_grips: Vec<GripView>,
    pub resize_handles: Vec<ResizeHandleView>,
    pub add_row: AddButtonView,
    pub add_column: AddButtonView,
    pub selection: Option<CellRange>,
    pub pill: Option<CellAddr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    pub grip: GripView,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub addr: CellAddr,
    /// Nested blocks the host mounts into this cell
    pub blocks: Vec<BlockId>,
    pub heading: bool,
    pub selected: bool,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub width: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GripView {
    pub index: usize,
    pub visible: bool,
    pub transition: Transition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeHandleView {
    pub column: usize,
    /// Offset of the handle from the table's left edge
    pub x: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddButtonView {
    pub visible: bool,
    /// Lines previewed by an ongoing drag
    pub preview: usize,
}

pub fn render(state: &TableState<'_>) -> TableView {
    let grid = state.grid;
    let widths = state.widths();

    let rows = grid
        .rows()
        .iter()
        .enumerate()
        .map(|(r, row)| RowView {
            grip: grip(r, state.grips.row, state.grips.transition),
            cells: row
                .iter()
                .enumerate()
                .map(|(c, cell)| {
                    let addr = CellAddr::new(r, c);
                    CellView {
                        addr,
                        blocks: cell.blocks.clone(),
                        heading: (grid.with_headings && r == 0) || (grid.with_heading_column && c == 0),
                        selected: state.selection.is_some_and(|s| s.contains(addr)),
                        color: cell.color.clone(),
                        text_color: cell.text_color.clone(),
                        width: widths.as_ref().and_then(|w| w.get(c).copied()),
                    }
                })
                .collect(),
        })
        .collect();

    TableView {
        block: state.block.clone(),
        width: widths.as_ref().map(|w| w.iter().sum()),
        rows,
        column_grips: (0..grid.col_count())
            .map(|c| grip(c, state.grips.column, state.grips.transition))
            .collect(),
        resize_handles: resize_handles(widths.as_deref(), state.resize),
        add_row: add_button(state.add, Axis::Row),
        add_column: add_button(state.add, Axis::Column),
        selection: state.selection,
        pill: state.pill,
    }
}

impl TableView {
    /// Bring volatile state up to date; returns true if anything changed
    ///
    /// The grid shape must match the one this view was rendered from.
    pub fn patch(&mut self, state: &TableState<'_>) -> bool {
        let before = self.clone();
        let widths = state.widths();

        for (r, row) in self.rows.iter_mut().enumerate() {
            row.grip = grip(r, state.grips.row, state.grips.transition);
            for cell in &mut row.cells {
                cell.selected = state.selection.is_some_and(|s| s.contains(cell.addr));
                cell.width = widths.as_ref().and_then(|w| w.get(cell.addr.col).copied());
            }
        }
        for grip_view in &mut self.column_grips {
            *grip_view = grip(grip_view.index, state.grips.column, state.grips.transition);
        }
        self.width = widths.as_ref().map(|w| w.iter().sum());
        self.resize_handles = resize_handles(widths.as_deref(), state.resize);
        self.add_row = add_button(state.add, Axis::Row);
        self.add_column = add_button(state.add, Axis::Column);
        self.selection = state.selection;
        self.pill = state.pill;

        *self != before
    }

    pub fn cell(&self, addr: CellAddr) -> Option<&CellView> {
        self.rows.get(addr.row).and_then(|r| r.cells.get(addr.col))
    }
}

fn grip(index: usize, visible: Option<usize>, transition: Transition) -> GripView {
    GripView {
        index,
        visible: visible == Some(index),
        transition,
    }
}

fn resize_handles(widths: Option<&[f64]>, resize: Option<&ColumnResize>) -> Vec<ResizeHandleView> {
    let Some(widths) = widths else {
        return Vec::new();
    };
    let mut x = 0.0;
    widths
        .iter()
        .enumerate()
        .map(|(column, w)| {
            x += w;
            ResizeHandleView {
                column,
                x,
                active: resize.is_some_and(|r| r.column() == column),
            }
        })
        .collect()
}

fn add_button(add: &AddControls, axis: Axis) -> AddButtonView {
    AddButtonView {
        visible: add.is_visible(axis),
        preview: add
            .preview()
            .filter(|(a, _)| *a == axis)
            .map_or(0, |(_, count)| count),
    }
}
