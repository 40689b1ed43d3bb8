//! Keyboard handling inside a table
//!
//! [`resolve`] maps a key press to what the table should do; the tool then
//! performs the action. Keys the table does not claim pass through to
//! ordinary text editing.

use crate::model::{CellAddr, CellRange};
use crate::mutations::TableMutation;
use crate::selection::Direction;
use serde::{Deserialize, Serialize};
use tablekit_editor::BlockId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Tab,
    Enter,
    Delete,
    Backspace,
    Escape,
    Arrow(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub key: Key,
    #[serde(default)]
    pub shift: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }
}

/// Where the caret is, as far as the table cares
#[derive(Debug, Clone, PartialEq)]
pub struct CaretContext {
    pub cell: CellAddr,
    pub block: BlockId,
    pub at_start: bool,
    pub at_end: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    /// Put the caret in the first block of a cell
    FocusCell(CellAddr),
    Mutate(TableMutation),
    ClearSelection,
    /// Extend the selection; `from` starts one at the caret cell
    ExtendSelection { direction: Direction, from: Option<CellAddr> },
    /// Not handled by the table
    PassThrough,
}

pub fn resolve(
    input: KeyInput,
    caret: Option<&CaretContext>,
    selection: Option<CellRange>,
    rows: usize,
    cols: usize,
) -> KeyAction {
    match input.key {
        Key::Tab => {
            let Some(from) = caret.map(|c| c.cell).or(selection.map(|r| r.top_left())) else {
                return KeyAction::PassThrough;
            };
            let target = if input.shift {
                previous_cell(from, cols)
            } else {
                next_cell(from, rows, cols)
            };
            KeyAction::FocusCell(target)
        }

        Key::Enter if !input.shift && selection.is_none() => match caret {
            Some(caret) => KeyAction::Mutate(TableMutation::InsertCellBlock {
                row: caret.cell.row,
                col: caret.cell.col,
                after: Some(caret.block.clone()),
            }),
            None => KeyAction::PassThrough,
        },

        Key::Delete | Key::Backspace => match selection {
            Some(range) => KeyAction::Mutate(TableMutation::ClearRange { range }),
            None => KeyAction::PassThrough,
        },

        Key::Escape if selection.is_some() => KeyAction::ClearSelection,

        Key::Arrow(direction) if input.shift => {
            if selection.is_some() {
                return KeyAction::ExtendSelection { direction, from: None };
            }
            match caret {
                Some(caret) if leaves_block(direction, caret) => KeyAction::ExtendSelection {
                    direction,
                    from: Some(caret.cell),
                },
                _ => KeyAction::PassThrough,
            }
        }

        Key::Arrow(_) if selection.is_some() => KeyAction::ClearSelection,

        _ => KeyAction::PassThrough,
    }
}

/// Shift+Arrow only leaves text selection when the caret sits at the edge
fn leaves_block(direction: Direction, caret: &CaretContext) -> bool {
    match direction {
        Direction::Left | Direction::Up => caret.at_start,
        Direction::Right | Direction::Down => caret.at_end,
    }
}

/// Next cell in reading order; the last cell stays put
fn next_cell(from: CellAddr, rows: usize, cols: usize) -> CellAddr {
    if from.col + 1 < cols {
        CellAddr::new(from.row, from.col + 1)
    } else if from.row + 1 < rows {
        CellAddr::new(from.row + 1, 0)
    } else {
        from
    }
}

/// Previous cell in reading order; the first cell stays put
fn previous_cell(from: CellAddr, cols: usize) -> CellAddr {
    if from.col > 0 {
        CellAddr::new(from.row, from.col - 1)
    } else if from.row > 0 {
        CellAddr::new(from.row - 1, cols.saturating_sub(1))
    } else {
        from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caret(row: usize, col: usize) -> CaretContext {
        CaretContext {
            cell: CellAddr::new(row, col),
            block: BlockId::new("b"),
            at_start: true,
            at_end: false,
        }
    }

    #[test]
    fn test_tab_wraps_rows() {
        let action = resolve(KeyInput::plain(Key::Tab), Some(&caret(0, 2)), None, 2, 3);
        assert_eq!(action, KeyAction::FocusCell(CellAddr::new(1, 0)));

        let action = resolve(KeyInput::shifted(Key::Tab), Some(&caret(1, 0)), None, 2, 3);
        assert_eq!(action, KeyAction::FocusCell(CellAddr::new(0, 2)));
    }

    #[test]
    fn test_tab_stays_inside_at_the_ends() {
        let action = resolve(KeyInput::plain(Key::Tab), Some(&caret(1, 2)), None, 2, 3);
        assert_eq!(action, KeyAction::FocusCell(CellAddr::new(1, 2)));

        let action = resolve(KeyInput::shifted(Key::Tab), Some(&caret(0, 0)), None, 2, 3);
        assert_eq!(action, KeyAction::FocusCell(CellAddr::new(0, 0)));
    }

    #[test]
    fn test_enter_adds_block_in_same_cell() {
        let action = resolve(KeyInput::plain(Key::Enter), Some(&caret(1, 1)), None, 2, 2);
        assert_eq!(
            action,
            KeyAction::Mutate(TableMutation::InsertCellBlock {
                row: 1,
                col: 1,
                after: Some(BlockId::new("b")),
            })
        );
    }

    #[test]
    fn test_delete_clears_only_with_selection() {
        let range = CellRange::new(CellAddr::new(0, 0), CellAddr::new(1, 1));
        let action = resolve(KeyInput::plain(Key::Backspace), None, Some(range), 2, 2);
        assert_eq!(action, KeyAction::Mutate(TableMutation::ClearRange { range }));

        let action = resolve(KeyInput::plain(Key::Backspace), Some(&caret(0, 0)), None, 2, 2);
        assert_eq!(action, KeyAction::PassThrough);
    }

    #[test]
    fn test_shift_arrow_at_text_edge() {
        let action = resolve(
            KeyInput::shifted(Key::Arrow(Direction::Left)),
            Some(&caret(1, 1)),
            None,
            2,
            2,
        );
        assert_eq!(
            action,
            KeyAction::ExtendSelection {
                direction: Direction::Left,
                from: Some(CellAddr::new(1, 1)),
            }
        );

        let action = resolve(
            KeyInput::shifted(Key::Arrow(Direction::Right)),
            Some(&caret(1, 1)),
            None,
            2,
            2,
        );
        assert_eq!(action, KeyAction::PassThrough);
    }

    #[test]
    fn test_escape_clears_selection() {
        let range = CellRange::single(CellAddr::new(0, 0));
        assert_eq!(
            resolve(KeyInput::plain(Key::Escape), None, Some(range), 1, 1),
            KeyAction::ClearSelection
        );
        assert_eq!(resolve(KeyInput::plain(Key::Escape), None, None, 1, 1), KeyAction::PassThrough);
    }
}
