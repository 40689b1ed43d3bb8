//! Row/column grips and the table's menus
//!
//! Grips appear next to the hovered row and column and open a menu of line
//! actions. The selection pill opens a menu of range actions. Menus go
//! through the editor's [`MenuService`](tablekit_editor::MenuService); item
//! ids are resolved back into actions here.

use crate::model::{CellAddr, CellRange, Grid};
use crate::mutations::{Position, TableMutation};
use serde::{Deserialize, Serialize};
use tablekit_editor::MenuItem;

/// Palette offered by the selection menu
pub const COLORS: &[&str] = &["gray", "brown", "orange", "yellow", "green", "blue", "purple", "pink", "red"];

/// How a grip appears when it becomes visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Transition {
    /// Fully visible immediately
    None,
    #[default]
    Fade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GripState {
    pub row: Option<usize>,
    pub column: Option<usize>,
    pub transition: Transition,
}

impl GripState {
    /// Show grips for the hovered cell; returns true if they moved
    pub fn hover(&mut self, addr: CellAddr) -> bool {
        let changed = self.row != Some(addr.row) || self.column != Some(addr.col);
        self.row = Some(addr.row);
        self.column = Some(addr.col);
        self.transition = Transition::Fade;
        changed
    }

    pub fn hide(&mut self) {
        self.row = None;
        self.column = None;
    }

    pub fn is_visible(&self) -> bool {
        self.row.is_some() || self.column.is_some()
    }

    /// Keep grips on lines that still exist
    pub fn clamp(&mut self, rows: usize, cols: usize) {
        self.row = self.row.filter(|_| rows > 0).map(|r| r.min(rows - 1));
        self.column = self.column.filter(|_| cols > 0).map(|c| c.min(cols - 1));
    }

    /// Same grips shown without a fade, clamped to a grid that may have shrunk
    pub fn restored(mut self, rows: usize, cols: usize) -> Self {
        self.clamp(rows, cols);
        self.transition = Transition::None;
        self
    }
}

/// What an open table menu refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTarget {
    Row(usize),
    Column(usize),
    Selection(CellRange),
}

impl MenuTarget {
    /// Anchor key for the popover
    pub fn anchor_key(&self) -> String {
        match self {
            MenuTarget::Row(row) => format!("row:{row}"),
            MenuTarget::Column(col) => format!("column:{col}"),
            MenuTarget::Selection(range) => format!("pill:{}:{}", range.min_row, range.max_col),
        }
    }

    pub fn items(&self, grid: &Grid) -> Vec<MenuItem> {
        match self {
            MenuTarget::Row(_) => {
                let mut items = vec![
                    MenuItem::new("insertAbove", "Insert row above"),
                    MenuItem::new("insertBelow", "Insert row below"),
                ];
                if grid.row_count() > 1 {
                    items.push(MenuItem::new("delete", "Delete row"));
                }
                items.push(MenuItem::new("toggleHeading", "Heading row"));
                items
            }
            MenuTarget::Column(_) => {
                let mut items = vec![
                    MenuItem::new("insertLeft", "Insert column left"),
                    MenuItem::new("insertRight", "Insert column right"),
                ];
                if grid.col_count() > 1 {
                    items.push(MenuItem::new("delete", "Delete column"));
                }
                items.push(MenuItem::new("toggleHeading", "Heading column"));
                items
            }
            MenuTarget::Selection(_) => {
                let mut items = vec![
                    MenuItem::new("copy", "Copy"),
                    MenuItem::new("cut", "Cut"),
                    MenuItem::new("clear", "Clear"),
                ];
                items.extend(
                    COLORS
                        .iter()
                        .map(|c| MenuItem::new(format!("color:{c}"), format!("Background {c}"))),
                );
                items.extend(
                    COLORS
                        .iter()
                        .map(|c| MenuItem::new(format!("textColor:{c}"), format!("Text {c}"))),
                );
                items.push(MenuItem::new("resetColor", "Default colors"));
                items
            }
        }
    }

    /// Action for a chosen item id
    pub fn resolve(&self, item: &str, grid: &Grid) -> Option<MenuAction> {
        let mutation = match (self, item) {
            (MenuTarget::Row(index), "insertAbove") => TableMutation::InsertRow {
                index: *index,
                position: Position::Before,
            },
            (MenuTarget::Row(index), "insertBelow") => TableMutation::InsertRow {
                index: *index,
                position: Position::After,
            },
            (MenuTarget::Row(index), "delete") => TableMutation::DeleteRow { index: *index },
            (MenuTarget::Row(_), "toggleHeading") => TableMutation::SetHeadings {
                with_headings: Some(!grid.with_headings),
                with_heading_column: None,
            },
            (MenuTarget::Column(index), "insertLeft") => TableMutation::InsertColumn {
                index: *index,
                position: Position::Before,
                width: None,
            },
            (MenuTarget::Column(index), "insertRight") => TableMutation::InsertColumn {
                index: *index,
                position: Position::After,
                width: None,
            },
            (MenuTarget::Column(index), "delete") => TableMutation::DeleteColumn { index: *index },
            (MenuTarget::Column(_), "toggleHeading") => TableMutation::SetHeadings {
                with_headings: None,
                with_heading_column: Some(!grid.with_heading_column),
            },
            (MenuTarget::Selection(_), "copy") => return Some(MenuAction::Copy),
            (MenuTarget::Selection(_), "cut") => return Some(MenuAction::Cut),
            (MenuTarget::Selection(range), "clear") => TableMutation::ClearRange { range: *range },
            (MenuTarget::Selection(range), "resetColor") => TableMutation::SetRangeColor {
                range: *range,
                color: None,
                text_color: None,
            },
            (MenuTarget::Selection(range), item) => {
                let (color, text_color) = color_choice(item, grid, *range)?;
                TableMutation::SetRangeColor {
                    range: *range,
                    color,
                    text_color,
                }
            }
            _ => return None,
        };
        Some(MenuAction::Mutate(mutation))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    Mutate(TableMutation),
    Copy,
    Cut,
}

/// Background or text color item; the other color keeps the value of the
/// range's first cell
fn color_choice(item: &str, grid: &Grid, range: CellRange) -> Option<(Option<String>, Option<String>)> {
    let first = grid.cell(range.top_left());
    if let Some(color) = item.strip_prefix("color:") {
        let text_color = first.and_then(|c| c.text_color.clone());
        return Some((Some(color.to_string()), text_color));
    }
    if let Some(text_color) = item.strip_prefix("textColor:") {
        let color = first.and_then(|c| c.color.clone());
        return Some((color, Some(text_color.to_string())));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restored_grips_skip_fade_and_clamp() {
        let mut grips = GripState::default();
        grips.hover(CellAddr::new(4, 1));
        assert_eq!(grips.transition, Transition::Fade);

        let restored = grips.restored(2, 2);
        assert_eq!(restored.row, Some(1));
        assert_eq!(restored.column, Some(1));
        assert_eq!(restored.transition, Transition::None);
    }

    #[test]
    fn test_row_menu_hides_delete_for_single_row() {
        let grid = Grid::default();
        let items = MenuTarget::Row(0).items(&grid);
        assert!(items.iter().all(|i| i.id != "delete"));
    }

    #[test]
    fn test_resolve_menu_items() {
        let grid = Grid::default();
        assert_eq!(
            MenuTarget::Column(2).resolve("delete", &grid),
            Some(MenuAction::Mutate(TableMutation::DeleteColumn { index: 2 }))
        );

        let range = CellRange::single(CellAddr::new(0, 0));
        assert_eq!(MenuTarget::Selection(range).resolve("cut", &grid), Some(MenuAction::Cut));
        assert_eq!(
            MenuTarget::Selection(range).resolve("color:yellow", &grid),
            Some(MenuAction::Mutate(TableMutation::SetRangeColor {
                range,
                color: Some("yellow".into()),
                text_color: None,
            }))
        );
        assert_eq!(MenuTarget::Row(0).resolve("copy", &grid), None);
    }
}
