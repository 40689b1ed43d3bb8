//! # Cell Data Model
//!
//! Two representations of one table:
//!
//! - **Persisted** ([`TableData`]): what the table block stores and saves.
//!   Cells may arrive as plain strings or as objects whose blocks are either
//!   ids or inline saved blocks.
//! - **Live** ([`Grid`]): normalized, rectangular, every cell holding block
//!   ids of nested blocks that exist in the document.
//!
//! Normalization happens once at the boundary; nothing past it branches on
//! the persisted shape.

use crate::config::TableConfig;
use crate::error::TableResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tablekit_editor::{Block, BlockId, Document, Transaction, PARAGRAPH};

/// Tool name of table blocks
pub const TOOL_NAME: &str = "table";

/// Position of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddr {
    pub row: usize,
    pub col: usize,
}

impl CellAddr {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A rectangular range of cells, inclusive on both ends
///
/// Deserialized ranges go through [`CellRange::new`], so min never exceeds max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawRange")]
pub struct CellRange {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRange {
    min_row: usize,
    min_col: usize,
    max_row: usize,
    max_col: usize,
}

impl From<RawRange> for CellRange {
    fn from(raw: RawRange) -> Self {
        Self::new(CellAddr::new(raw.min_row, raw.min_col), CellAddr::new(raw.max_row, raw.max_col))
    }
}

impl CellRange {
    /// Normalized range spanning two corners
    pub fn new(a: CellAddr, b: CellAddr) -> Self {
        Self {
            min_row: a.row.min(b.row),
            min_col: a.col.min(b.col),
            max_row: a.row.max(b.row),
            max_col: a.col.max(b.col),
        }
    }

    pub fn single(addr: CellAddr) -> Self {
        Self::new(addr, addr)
    }

    pub fn contains(&self, addr: CellAddr) -> bool {
        (self.min_row..=self.max_row).contains(&addr.row) && (self.min_col..=self.max_col).contains(&addr.col)
    }

    pub fn row_count(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub fn col_count(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    pub fn cell_count(&self) -> usize {
        self.row_count() * self.col_count()
    }

    pub fn is_single(&self) -> bool {
        self.cell_count() == 1
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = CellAddr> {
        let (min_col, max_col) = (self.min_col, self.max_col);
        (self.min_row..=self.max_row).flat_map(move |row| (min_col..=max_col).map(move |col| CellAddr::new(row, col)))
    }

    /// Intersect with a `rows` x `cols` grid
    pub fn clamp(&self, rows: usize, cols: usize) -> Option<Self> {
        if rows == 0 || cols == 0 || self.min_row >= rows || self.min_col >= cols {
            return None;
        }
        Some(Self {
            min_row: self.min_row,
            min_col: self.min_col,
            max_row: self.max_row.min(rows - 1),
            max_col: self.max_col.min(cols - 1),
        })
    }

    pub fn top_left(&self) -> CellAddr {
        CellAddr::new(self.min_row, self.min_col)
    }

    pub fn top_right(&self) -> CellAddr {
        CellAddr::new(self.min_row, self.max_col)
    }
}

// ---------------------------------------------------------------------------
// Persisted form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    #[serde(default)]
    pub with_headings: bool,

    #[serde(default)]
    pub with_heading_column: bool,

    /// Pixel widths, one per column; absent means proportional layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_widths: Option<Vec<f64>>,

    #[serde(default)]
    pub content: Vec<Vec<CellContent>>,
}

impl TableData {
    pub fn from_value(value: &Value) -> TableResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_value(&self) -> TableResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A persisted cell: string shorthand or full object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellContent {
    Text(String),
    Cell(CellData),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    #[serde(default)]
    pub blocks: Vec<BlockRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

/// Reference to a nested block: an id, or the block's saved data inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockRef {
    Id(BlockId),
    Saved(SavedBlock),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,

    #[serde(rename = "type", default = "default_tool")]
    pub tool: String,

    #[serde(default)]
    pub data: Value,
}

fn default_tool() -> String {
    PARAGRAPH.to_string()
}

// ---------------------------------------------------------------------------
// Live form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    /// Nested blocks in display order; never empty once normalized
    pub blocks: Vec<BlockId>,
    pub color: Option<String>,
    pub text_color: Option<String>,
}

impl Cell {
    pub fn with_block(block: BlockId) -> Self {
        Self {
            blocks: vec![block],
            ..Self::default()
        }
    }

    /// No text in any block and no colors
    pub fn is_blank(&self, doc: &Document) -> bool {
        self.color.is_none()
            && self.text_color.is_none()
            && self
                .blocks
                .iter()
                .all(|id| doc.block(id).map_or(true, Block::is_empty))
    }

    /// Text of each block
    pub fn texts(&self, doc: &Document) -> Vec<String> {
        self.blocks
            .iter()
            .filter_map(|id| doc.block(id))
            .map(|b| b.text().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    pub with_headings: bool,
    pub with_heading_column: bool,
    pub col_widths: Option<Vec<f64>>,
}

impl Grid {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell(&self, addr: CellAddr) -> Option<&Cell> {
        self.rows.get(addr.row).and_then(|r| r.get(addr.col))
    }

    pub fn cell_mut(&mut self, addr: CellAddr) -> Option<&mut Cell> {
        self.rows.get_mut(addr.row).and_then(|r| r.get_mut(addr.col))
    }

    pub fn contains(&self, addr: CellAddr) -> bool {
        addr.row < self.row_count() && addr.col < self.col_count()
    }

    /// Range covering every cell
    pub fn full_range(&self) -> Option<CellRange> {
        CellRange::new(
            CellAddr::new(0, 0),
            CellAddr::new(self.row_count().saturating_sub(1), self.col_count().saturating_sub(1)),
        )
        .clamp(self.row_count(), self.col_count())
    }

    /// Every row holds the same number of cells
    pub fn is_rectangular(&self) -> bool {
        let cols = self.col_count();
        self.rows.iter().all(|r| r.len() == cols)
    }

    /// Cell and index within the cell of a nested block
    pub fn locate_block(&self, id: &BlockId) -> Option<(CellAddr, usize)> {
        self.rows.iter().enumerate().find_map(|(r, row)| {
            row.iter().enumerate().find_map(|(c, cell)| {
                cell.blocks
                    .iter()
                    .position(|b| b == id)
                    .map(|i| (CellAddr::new(r, c), i))
            })
        })
    }

    /// All nested block ids, row-major
    pub fn block_ids(&self) -> impl Iterator<Item = &BlockId> {
        self.rows.iter().flatten().flat_map(|cell| cell.blocks.iter())
    }

    /// Column widths, falling back to `default` for proportional layout
    pub fn widths_or(&self, default: f64) -> Vec<f64> {
        self.col_widths
            .clone()
            .unwrap_or_else(|| vec![default; self.col_count()])
    }

    pub fn total_width(&self) -> Option<f64> {
        self.col_widths.as_ref().map(|w| w.iter().sum())
    }

    pub(crate) fn insert_row(&mut self, at: usize, cells: Vec<Cell>) {
        let at = at.min(self.rows.len());
        self.rows.insert(at, cells);
    }

    pub(crate) fn remove_row(&mut self, at: usize) -> Vec<Cell> {
        self.rows.remove(at)
    }

    /// Insert one cell per row at column `at`
    pub(crate) fn insert_column(&mut self, at: usize, cells: Vec<Cell>) {
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            let at = at.min(row.len());
            row.insert(at, cell);
        }
    }

    pub(crate) fn remove_column(&mut self, at: usize) -> Vec<Cell> {
        self.rows.iter_mut().map(|row| row.remove(at)).collect()
    }

    /// Rebuild from stored data without writing to the document
    ///
    /// References to blocks the document no longer holds are dropped, which
    /// can leave a cell without blocks; callers treat such cells as
    /// unfocusable rather than repairing them.
    pub fn from_stored(data: &TableData, doc: &Document) -> Self {
        let width = data.content.iter().map(Vec::len).max().unwrap_or(0);
        let rows: Vec<Vec<Cell>> = data
            .content
            .iter()
            .map(|row| {
                (0..width)
                    .map(|col| match row.get(col) {
                        Some(CellContent::Cell(cell)) => Cell {
                            blocks: cell
                                .blocks
                                .iter()
                                .filter_map(|r| r.id().filter(|id| doc.contains(id)).cloned())
                                .collect(),
                            color: cell.color.clone(),
                            text_color: cell.text_color.clone(),
                        },
                        _ => Cell::default(),
                    })
                    .collect()
            })
            .collect();

        Self {
            rows,
            with_headings: data.with_headings,
            with_heading_column: data.with_heading_column,
            col_widths: data.col_widths.clone().filter(|w| w.len() == width),
        }
    }

    /// Normalize persisted data, creating the nested blocks it implies
    ///
    /// String cells become one paragraph, inline saved blocks are created
    /// (keeping their id when free), and cells left without blocks get an
    /// empty paragraph. Jagged rows are padded to the widest row; empty
    /// content becomes a default-sized grid.
    pub fn normalize(
        data: &TableData,
        tx: &mut Transaction<'_>,
        table: &BlockId,
        config: &TableConfig,
    ) -> TableResult<Self> {
        let width = data.content.iter().map(Vec::len).max().unwrap_or(0);
        let (row_count, col_count) = if width == 0 {
            (config.default_rows.max(1), config.default_cols.max(1))
        } else {
            (data.content.len(), width)
        };

        let mut rows = Vec::with_capacity(row_count);
        for r in 0..row_count {
            let mut row = Vec::with_capacity(col_count);
            for c in 0..col_count {
                let content = data.content.get(r).and_then(|row| row.get(c));
                row.push(normalize_cell(content, tx, table)?);
            }
            rows.push(row);
        }

        let col_widths = data.col_widths.clone().filter(|w| w.len() == col_count);
        if data.col_widths.is_some() && col_widths.is_none() {
            tracing::debug!(table = %table, "Dropping colWidths that do not match the column count");
        }

        Ok(Self {
            rows,
            with_headings: data.with_headings,
            with_heading_column: data.with_heading_column,
            col_widths,
        })
    }

    /// Form written into the table block: cells reference blocks by id
    pub fn to_stored(&self) -> TableData {
        self.to_data(|id| Some(BlockRef::Id(id.clone())))
    }

    /// Saved form: cells carry their blocks' saved data inline
    pub fn to_saved(&self, doc: &Document) -> TableData {
        self.to_data(|id| {
            doc.block(id).map(|block| {
                BlockRef::Saved(SavedBlock {
                    id: Some(block.id.clone()),
                    tool: block.tool.clone(),
                    data: block.data.clone(),
                })
            })
        })
    }

    fn to_data(&self, block_ref: impl Fn(&BlockId) -> Option<BlockRef>) -> TableData {
        TableData {
            with_headings: self.with_headings,
            with_heading_column: self.with_heading_column,
            col_widths: self.col_widths.clone(),
            content: self
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| {
                            CellContent::Cell(CellData {
                                blocks: cell.blocks.iter().filter_map(&block_ref).collect(),
                                color: cell.color.clone(),
                                text_color: cell.text_color.clone(),
                            })
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

impl BlockRef {
    pub fn id(&self) -> Option<&BlockId> {
        match self {
            BlockRef::Id(id) => Some(id),
            BlockRef::Saved(saved) => saved.id.as_ref(),
        }
    }
}

fn normalize_cell(
    content: Option<&CellContent>,
    tx: &mut Transaction<'_>,
    table: &BlockId,
) -> TableResult<Cell> {
    let mut cell = Cell::default();

    match content {
        Some(CellContent::Text(text)) => {
            cell.blocks.push(tx.insert_paragraph(table, text)?);
        }
        Some(CellContent::Cell(data)) => {
            cell.color = data.color.clone();
            cell.text_color = data.text_color.clone();
            for block_ref in &data.blocks {
                if let Some(id) = adopt_block(block_ref, tx, table)? {
                    cell.blocks.push(id);
                }
            }
        }
        None => {}
    }

    if cell.blocks.is_empty() {
        cell.blocks.push(tx.insert_paragraph(table, "")?);
    }
    Ok(cell)
}

fn adopt_block(block_ref: &BlockRef, tx: &mut Transaction<'_>, table: &BlockId) -> TableResult<Option<BlockId>> {
    match block_ref {
        BlockRef::Id(id) if tx.block(id).is_some() => Ok(Some(id.clone())),
        BlockRef::Id(id) => {
            tracing::debug!(block = %id, "Cell references a missing block");
            Ok(None)
        }
        BlockRef::Saved(saved) => {
            if let Some(id) = saved.id.as_ref().filter(|id| tx.block(id).is_some()) {
                return Ok(Some(id.clone()));
            }
            let id = match &saved.id {
                Some(id) => id.clone(),
                None => tx.generate_id(),
            };
            let data = if saved.data.is_null() {
                tablekit_editor::paragraph_data("")
            } else {
                saved.data.clone()
            };
            let block = Block::new(id, saved.tool.clone(), data).with_parent(table.clone());
            Ok(Some(tx.insert_block(block, None)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablekit_editor::Origin;

    fn table_doc() -> (Document, BlockId) {
        let mut doc = Document::new();
        let table = BlockId::new("t");
        doc.transact(Origin::Silent, |tx| {
            tx.insert_block(Block::new(table.clone(), TOOL_NAME, Value::Null), None)
        })
        .unwrap();
        (doc, table)
    }

    fn normalize(doc: &mut Document, table: &BlockId, data: &TableData) -> Grid {
        doc.transact(Origin::Silent, |tx| {
            Grid::normalize(data, tx, table, &TableConfig::default())
        })
        .unwrap()
    }

    #[test]
    fn test_range_normalizes_corners() {
        let range = CellRange::new(CellAddr::new(2, 0), CellAddr::new(0, 1));
        assert_eq!(range.top_left(), CellAddr::new(0, 0));
        assert_eq!(range.cell_count(), 6);
        assert_eq!(range.cells().count(), 6);
        assert!(range.contains(CellAddr::new(1, 1)));
        assert!(!range.contains(CellAddr::new(1, 2)));
    }

    #[test]
    fn test_deserialized_range_is_normalized() {
        let range: CellRange =
            serde_json::from_str(r#"{ "minRow": 1, "minCol": 2, "maxRow": 0, "maxCol": 0 }"#).unwrap();
        assert_eq!(range, CellRange::new(CellAddr::new(0, 0), CellAddr::new(1, 2)));
        assert_eq!(range.cell_count(), 6);
    }

    #[test]
    fn test_range_clamp() {
        let range = CellRange::new(CellAddr::new(1, 1), CellAddr::new(4, 4));
        assert_eq!(
            range.clamp(3, 2),
            Some(CellRange::new(CellAddr::new(1, 1), CellAddr::new(2, 1)))
        );
        assert_eq!(range.clamp(1, 5), None);
    }

    #[test]
    fn test_empty_content_creates_default_grid() {
        let (mut doc, table) = table_doc();
        let grid = normalize(&mut doc, &table, &TableData::default());

        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.col_count(), 3);
        assert_eq!(grid.block_ids().count(), 9);
        assert_eq!(doc.children_of(&table).len(), 9);
    }

    #[test]
    fn test_string_shorthand_and_jagged_rows() {
        let (mut doc, table) = table_doc();
        let data: TableData = serde_json::from_str(
            r#"{ "content": [["a", "b", "c"], ["d"]], "colWidths": [100, 200] }"#,
        )
        .unwrap();
        let grid = normalize(&mut doc, &table, &data);

        assert!(grid.is_rectangular());
        assert_eq!(grid.col_count(), 3);
        assert_eq!(grid.cell(CellAddr::new(1, 0)).unwrap().texts(&doc), vec!["d"]);
        assert_eq!(grid.cell(CellAddr::new(1, 2)).unwrap().texts(&doc), vec![""]);
        assert_eq!(grid.col_widths, None);
    }

    #[test]
    fn test_object_cells_keep_ids_and_colors() {
        let (mut doc, table) = table_doc();
        let data: TableData = serde_json::from_str(
            r#"{ "content": [[{ "blocks": [{ "id": "x1", "type": "paragraph", "data": { "text": "hi" } }], "color": "red", "textColor": "blue" }]] }"#,
        )
        .unwrap();
        let grid = normalize(&mut doc, &table, &data);

        let cell = grid.cell(CellAddr::new(0, 0)).unwrap();
        assert_eq!(cell.blocks, vec![BlockId::new("x1")]);
        assert_eq!(cell.color.as_deref(), Some("red"));
        assert_eq!(cell.text_color.as_deref(), Some("blue"));
        assert_eq!(doc.block(&"x1".into()).unwrap().parent, Some(table));
    }

    #[test]
    fn test_stored_form_rebuilds_same_grid() {
        let (mut doc, table) = table_doc();
        let data: TableData = serde_json::from_str(r#"{ "withHeadings": true, "content": [["a", "b"]] }"#).unwrap();
        let grid = normalize(&mut doc, &table, &data);

        let rebuilt = Grid::from_stored(&grid.to_stored(), &doc);
        assert_eq!(rebuilt, grid);
    }

    #[test]
    fn test_from_stored_drops_missing_blocks() {
        let (doc, _) = table_doc();
        let data: TableData = serde_json::from_str(r#"{ "content": [[{ "blocks": ["gone"] }]] }"#).unwrap();
        let grid = Grid::from_stored(&data, &doc);
        assert!(grid.cell(CellAddr::new(0, 0)).unwrap().blocks.is_empty());
    }

    #[test]
    fn test_saved_form_inlines_block_data() {
        let (mut doc, table) = table_doc();
        let data: TableData = serde_json::from_str(r#"{ "content": [["hello"]] }"#).unwrap();
        let grid = normalize(&mut doc, &table, &data);

        let saved = serde_json::to_value(grid.to_saved(&doc)).unwrap();
        assert_eq!(saved["content"][0][0]["blocks"][0]["type"], "paragraph");
        assert_eq!(saved["content"][0][0]["blocks"][0]["data"]["text"], "hello");
        assert!(saved.get("colWidths").is_none());
    }
}
