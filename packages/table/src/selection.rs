//! # Selection Engine
//!
//! ```text
//!         pointer down            pointer up
//!  Idle ───────────────→ Dragging ──────────→ Selected
//!   ↑                     │   ↺ move           │  ↺ shift+arrow
//!   └─────────────────────┴────────────────────┘
//!        escape / outside click / clear / cut / paste
//! ```
//!
//! A press on cell chrome (padding, border) that is released in the same
//! cell selects that single cell. A press inside editable content released
//! in the same cell is an ordinary caret placement and leaves the engine
//! idle, so Backspace keeps editing text; dragging out of the cell turns it
//! into a range selection.

use crate::model::{CellAddr, CellRange};
use serde::{Deserialize, Serialize};

/// What the pointer went down on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Editable content of a nested block
    Content,
    /// Cell padding or border
    Chrome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Neighbour of `addr`, clamped to a `rows` x `cols` grid
    pub fn step(self, addr: CellAddr, rows: usize, cols: usize) -> CellAddr {
        let (row, col) = match self {
            Direction::Up => (addr.row.saturating_sub(1), addr.col),
            Direction::Down => (addr.row + 1, addr.col),
            Direction::Left => (addr.row, addr.col.saturating_sub(1)),
            Direction::Right => (addr.row, addr.col + 1),
        };
        CellAddr::new(row.min(rows.saturating_sub(1)), col.min(cols.saturating_sub(1)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Dragging {
        anchor: CellAddr,
        focus: CellAddr,
        from_content: bool,
    },
    Selected {
        anchor: CellAddr,
        focus: CellAddr,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    state: SelectionState,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Live normalized range, if any cells are selected
    ///
    /// A drag that started in content and has not left its cell selects
    /// nothing yet.
    pub fn range(&self) -> Option<CellRange> {
        match self.state {
            SelectionState::Idle => None,
            SelectionState::Dragging {
                anchor,
                focus,
                from_content,
            } => (!from_content || anchor != focus).then(|| CellRange::new(anchor, focus)),
            SelectionState::Selected { anchor, focus } => Some(CellRange::new(anchor, focus)),
        }
    }

    /// A committed selection that keyboard actions operate on
    pub fn active_range(&self) -> Option<CellRange> {
        match self.state {
            SelectionState::Selected { anchor, focus } => Some(CellRange::new(anchor, focus)),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SelectionState::Dragging { .. })
    }

    /// Cell the action pill is anchored to
    pub fn pill_anchor(&self) -> Option<CellAddr> {
        self.range().map(|r| r.top_right())
    }

    pub fn pointer_down(&mut self, addr: CellAddr, target: PointerTarget, shift: bool) {
        self.state = match self.state {
            SelectionState::Selected { anchor, .. } if shift => SelectionState::Dragging {
                anchor,
                focus: addr,
                from_content: false,
            },
            _ => SelectionState::Dragging {
                anchor: addr,
                focus: addr,
                from_content: target == PointerTarget::Content,
            },
        };
    }

    /// Move the focus corner; returns true if the range changed
    pub fn pointer_move(&mut self, addr: CellAddr) -> bool {
        match &mut self.state {
            SelectionState::Dragging { focus, .. } if *focus != addr => {
                *focus = addr;
                true
            }
            _ => false,
        }
    }

    pub fn pointer_up(&mut self) {
        if let SelectionState::Dragging {
            anchor,
            focus,
            from_content,
        } = self.state
        {
            self.state = if from_content && anchor == focus {
                SelectionState::Idle
            } else {
                SelectionState::Selected { anchor, focus }
            };
        }
    }

    pub fn pointer_cancel(&mut self) {
        if self.is_dragging() {
            self.state = SelectionState::Idle;
        }
    }

    /// Select a range programmatically
    pub fn select(&mut self, range: CellRange) {
        self.state = SelectionState::Selected {
            anchor: range.top_left(),
            focus: CellAddr::new(range.max_row, range.max_col),
        };
    }

    /// Shift+Arrow: extend the committed range, or start one from `origin`
    ///
    /// Returns true if a selection exists afterwards.
    pub fn extend(&mut self, direction: Direction, origin: Option<CellAddr>, rows: usize, cols: usize) -> bool {
        match self.state {
            SelectionState::Selected { anchor, focus } => {
                self.state = SelectionState::Selected {
                    anchor,
                    focus: direction.step(focus, rows, cols),
                };
                true
            }
            SelectionState::Idle => match origin {
                Some(origin) => {
                    self.state = SelectionState::Selected {
                        anchor: origin,
                        focus: direction.step(origin, rows, cols),
                    };
                    true
                }
                None => false,
            },
            SelectionState::Dragging { .. } => false,
        }
    }

    /// Drop the selection; returns true if one was active
    pub fn clear(&mut self) -> bool {
        let was_active = self.state != SelectionState::Idle;
        self.state = SelectionState::Idle;
        was_active
    }

    /// Keep corners inside a grid that may have shrunk
    pub fn clamp(&mut self, rows: usize, cols: usize) {
        if rows == 0 || cols == 0 {
            self.state = SelectionState::Idle;
            return;
        }
        let fit = |a: CellAddr| CellAddr::new(a.row.min(rows - 1), a.col.min(cols - 1));
        self.state = match self.state {
            SelectionState::Idle => SelectionState::Idle,
            SelectionState::Dragging {
                anchor,
                focus,
                from_content,
            } => SelectionState::Dragging {
                anchor: fit(anchor),
                focus: fit(focus),
                from_content,
            },
            SelectionState::Selected { anchor, focus } => SelectionState::Selected {
                anchor: fit(anchor),
                focus: fit(focus),
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(row: usize, col: usize) -> CellAddr {
        CellAddr::new(row, col)
    }

    #[test]
    fn test_drag_selects_normalized_range() {
        let mut sel = SelectionEngine::new();
        sel.pointer_down(at(2, 2), PointerTarget::Content, false);
        assert_eq!(sel.range(), None);

        assert!(sel.pointer_move(at(0, 1)));
        assert_eq!(sel.range(), Some(CellRange::new(at(0, 1), at(2, 2))));
        assert_eq!(sel.pill_anchor(), Some(at(0, 2)));

        sel.pointer_up();
        assert_eq!(sel.active_range(), Some(CellRange::new(at(0, 1), at(2, 2))));
    }

    #[test]
    fn test_chrome_click_selects_single_cell() {
        let mut sel = SelectionEngine::new();
        sel.pointer_down(at(1, 0), PointerTarget::Chrome, false);
        sel.pointer_up();
        assert_eq!(sel.active_range(), Some(CellRange::single(at(1, 0))));
    }

    #[test]
    fn test_content_click_keeps_caret_editing() {
        let mut sel = SelectionEngine::new();
        sel.select(CellRange::new(at(0, 0), at(1, 1)));

        sel.pointer_down(at(1, 1), PointerTarget::Content, false);
        sel.pointer_up();
        assert_eq!(sel.state(), SelectionState::Idle);
    }

    #[test]
    fn test_shift_arrow_extends_and_clamps() {
        let mut sel = SelectionEngine::new();
        assert!(!sel.extend(Direction::Right, None, 2, 2));

        assert!(sel.extend(Direction::Right, Some(at(0, 0)), 2, 2));
        assert!(sel.extend(Direction::Right, None, 2, 2));
        assert!(sel.extend(Direction::Down, None, 2, 2));
        assert_eq!(sel.active_range(), Some(CellRange::new(at(0, 0), at(1, 1))));
    }

    #[test]
    fn test_shift_click_extends_from_anchor() {
        let mut sel = SelectionEngine::new();
        sel.select(CellRange::single(at(0, 0)));
        sel.pointer_down(at(2, 1), PointerTarget::Content, true);
        sel.pointer_up();
        assert_eq!(sel.active_range(), Some(CellRange::new(at(0, 0), at(2, 1))));
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut sel = SelectionEngine::new();
        sel.select(CellRange::new(at(0, 0), at(2, 2)));
        sel.clamp(2, 1);
        assert_eq!(sel.active_range(), Some(CellRange::new(at(0, 0), at(1, 0))));

        sel.clamp(0, 0);
        assert_eq!(sel.state(), SelectionState::Idle);
    }

    #[test]
    fn test_escape_and_cancel() {
        let mut sel = SelectionEngine::new();
        sel.pointer_down(at(0, 0), PointerTarget::Chrome, false);
        sel.pointer_cancel();
        assert_eq!(sel.state(), SelectionState::Idle);

        sel.select(CellRange::single(at(0, 0)));
        assert!(sel.clear());
        assert!(!sel.clear());
    }
}
