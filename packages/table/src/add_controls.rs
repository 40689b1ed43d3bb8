//! Add-row / add-column buttons
//!
//! The buttons sit past the bottom and right edges of the table and show up
//! when the pointer comes near those edges. A click appends exactly one
//! line. Pressing and dragging away from the table previews one more line
//! per unit of travel; dragging back retracts previewed lines, never below
//! zero, so lines that existed before the gesture are never touched. Only
//! release commits, as one transaction; cancel commits nothing.

use crate::config::TableConfig;
use crate::model::Grid;
use crate::mutations::{Position, TableMutation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

#[derive(Debug, Clone, PartialEq)]
struct Gesture {
    axis: Axis,
    start: f64,
    unit: f64,
    moved: bool,
    count: usize,
}

/// Lines to append when a gesture ends
#[derive(Debug, Clone, PartialEq)]
pub struct AddCommit {
    pub axis: Axis,
    pub count: usize,
    /// Width for dragged-in columns; clicks use the neighbour average
    pub width: Option<f64>,
}

impl AddCommit {
    /// Mutations appending the lines, in application order
    pub fn mutations(&self, grid: &Grid) -> Vec<TableMutation> {
        (0..self.count)
            .map(|i| match self.axis {
                Axis::Row => TableMutation::InsertRow {
                    index: grid.row_count() + i - 1,
                    position: Position::After,
                },
                Axis::Column => TableMutation::InsertColumn {
                    index: grid.col_count() + i - 1,
                    position: Position::After,
                    width: self.width,
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddControls {
    always_visible: bool,
    row_visible: bool,
    column_visible: bool,
    gesture: Option<Gesture>,
}

impl AddControls {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            always_visible: config.always_show_add_controls,
            row_visible: false,
            column_visible: false,
            gesture: None,
        }
    }

    /// Update visibility for a pointer at (`x`, `y`) relative to a table of
    /// `width` x `height`; returns true if visibility changed
    pub fn hover(&mut self, x: f64, y: f64, width: f64, height: f64, config: &TableConfig) -> bool {
        let near = config.edge_proximity;
        let row = (y - height).abs() <= near && (-near..=width + near).contains(&x);
        let column = (x - width).abs() <= near && (-near..=height + near).contains(&y);

        let changed = row != self.row_visible || column != self.column_visible;
        self.row_visible = row;
        self.column_visible = column;
        changed
    }

    pub fn leave(&mut self) {
        if self.gesture.is_none() {
            self.row_visible = false;
            self.column_visible = false;
        }
    }

    pub fn is_visible(&self, axis: Axis) -> bool {
        let hovered = match axis {
            Axis::Row => self.row_visible,
            Axis::Column => self.column_visible,
        };
        self.always_visible || hovered || self.gesture.as_ref().is_some_and(|g| g.axis == axis)
    }

    /// Press on a button; `pos` is the pointer coordinate along the axis
    /// and `unit` the travel that adds one line
    pub fn press(&mut self, axis: Axis, pos: f64, unit: f64) {
        self.gesture = Some(Gesture {
            axis,
            start: pos,
            unit: unit.max(1.0),
            moved: false,
            count: 0,
        });
    }

    /// Returns the new preview count when it changed
    pub fn drag(&mut self, pos: f64, config: &TableConfig) -> Option<usize> {
        let gesture = self.gesture.as_mut()?;
        let delta = pos - gesture.start;
        if !gesture.moved && delta.abs() < config.drag_threshold {
            return None;
        }
        gesture.moved = true;

        let count = (delta.max(0.0) / gesture.unit).floor() as usize;
        if count == gesture.count {
            return None;
        }
        tracing::debug!(axis = ?gesture.axis, from = gesture.count, to = count, "Add preview changed");
        gesture.count = count;
        Some(count)
    }

    /// Lines previewed by the current drag
    pub fn preview(&self) -> Option<(Axis, usize)> {
        self.gesture
            .as_ref()
            .filter(|g| g.moved)
            .map(|g| (g.axis, g.count))
    }

    /// Button the current gesture started on
    pub fn pressed_axis(&self) -> Option<Axis> {
        self.gesture.as_ref().map(|g| g.axis)
    }

    /// End the gesture: a click adds one line, a drag its preview count
    pub fn release(&mut self) -> Option<AddCommit> {
        let gesture = self.gesture.take()?;
        let (count, width) = if gesture.moved {
            (gesture.count, Some(gesture.unit))
        } else {
            (1, None)
        };

        (count > 0).then(|| AddCommit {
            axis: gesture.axis,
            count,
            width: match gesture.axis {
                Axis::Column => width,
                Axis::Row => None,
            },
        })
    }

    pub fn cancel(&mut self) {
        if let Some(gesture) = self.gesture.take() {
            tracing::debug!(axis = ?gesture.axis, previewed = gesture.count, "Add gesture cancelled");
        }
    }
}

/// Drag unit for columns: a fraction of the average column width
pub fn column_unit(widths: &[f64], config: &TableConfig) -> f64 {
    if widths.is_empty() {
        return config.default_column_width * config.column_unit_ratio;
    }
    let average = widths.iter().sum::<f64>() / widths.len() as f64;
    average * config.column_unit_ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_adds_exactly_one() {
        let config = TableConfig::default();
        let mut controls = AddControls::new(&config);

        controls.press(Axis::Row, 100.0, 36.0);
        assert_eq!(controls.drag(103.0, &config), None);
        assert_eq!(controls.preview(), None);

        let commit = controls.release().unwrap();
        assert_eq!(commit.count, 1);
        assert_eq!(commit.width, None);
    }

    #[test]
    fn test_drag_is_symmetric() {
        let config = TableConfig::default();
        let mut controls = AddControls::new(&config);
        controls.press(Axis::Column, 0.0, 75.0);

        assert_eq!(controls.drag(160.0, &config), Some(2));
        assert_eq!(controls.drag(80.0, &config), Some(1));
        assert_eq!(controls.drag(-200.0, &config), Some(0));
        assert_eq!(controls.drag(90.0, &config), Some(1));

        let commit = controls.release().unwrap();
        assert_eq!(commit.count, 1);
        assert_eq!(commit.width, Some(75.0));
    }

    #[test]
    fn test_drag_back_to_start_commits_nothing() {
        let config = TableConfig::default();
        let mut controls = AddControls::new(&config);
        controls.press(Axis::Row, 0.0, 36.0);
        controls.drag(80.0, &config);
        controls.drag(10.0, &config);
        assert_eq!(controls.release(), None);
    }

    #[test]
    fn test_cancel_commits_nothing() {
        let config = TableConfig::default();
        let mut controls = AddControls::new(&config);
        controls.press(Axis::Row, 0.0, 36.0);
        controls.drag(100.0, &config);
        controls.cancel();
        assert_eq!(controls.release(), None);
    }

    #[test]
    fn test_proximity_reveal() {
        let config = TableConfig::default();
        let mut controls = AddControls::new(&config);

        assert!(controls.hover(50.0, 190.0, 300.0, 200.0, &config));
        assert!(controls.is_visible(Axis::Row));
        assert!(!controls.is_visible(Axis::Column));

        controls.hover(50.0, 50.0, 300.0, 200.0, &config);
        assert!(!controls.is_visible(Axis::Row));

        let always = AddControls::new(&TableConfig {
            always_show_add_controls: true,
            ..TableConfig::default()
        });
        assert!(always.is_visible(Axis::Column));
    }

    #[test]
    fn test_column_unit_is_half_average() {
        let config = TableConfig::default();
        assert_eq!(column_unit(&[100.0, 200.0], &config), 75.0);
        assert_eq!(column_unit(&[], &config), 75.0);
    }
}
