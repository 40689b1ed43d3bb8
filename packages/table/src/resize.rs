//! Column resize drag
//!
//! A resize gesture holds no transaction: widths change live on the gesture
//! and only [`ColumnResize::finish`] produces a mutation to commit.

use crate::config::TableConfig;
use crate::mutations::TableMutation;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnResize {
    column: usize,
    start_x: f64,
    original: Vec<f64>,
    widths: Vec<f64>,
    min_width: f64,
}

impl ColumnResize {
    /// Start dragging the right edge of `column`
    pub fn begin(column: usize, x: f64, widths: Vec<f64>, config: &TableConfig) -> Option<Self> {
        if column >= widths.len() {
            return None;
        }
        tracing::debug!(column, "Resize started");
        Some(Self {
            column,
            start_x: x,
            original: widths.clone(),
            widths,
            min_width: config.min_column_width,
        })
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Live widths for a pointer at `x`
    pub fn update(&mut self, x: f64) -> &[f64] {
        let width = self.original[self.column] + (x - self.start_x);
        self.widths[self.column] = width.max(self.min_width);
        &self.widths
    }

    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    pub fn total_width(&self) -> f64 {
        self.widths.iter().sum()
    }

    /// Mutation committing the final widths, if they changed
    pub fn finish(self) -> Option<TableMutation> {
        (self.widths != self.original).then(|| TableMutation::SetColumnWidths {
            widths: Some(self.widths),
        })
    }

    /// Abort, returning the widths to show again
    pub fn cancel(self) -> Vec<f64> {
        tracing::debug!(column = self.column, "Resize cancelled");
        self.original
    }
}

/// Column whose right-edge handle is under `x`
///
/// The hit area extends `slop` on each side of the visual line.
pub fn hit_test(widths: &[f64], x: f64, slop: f64) -> Option<usize> {
    let mut edge = 0.0;
    widths.iter().enumerate().find_map(|(col, w)| {
        edge += w;
        ((x - edge).abs() <= slop).then_some(col)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_resize_respects_min_width() {
        let config = TableConfig::default();
        let mut resize = ColumnResize::begin(0, 100.0, vec![100.0, 100.0], &config).unwrap();

        assert_eq!(resize.update(140.0), &[140.0, 100.0]);
        assert_eq!(resize.total_width(), 240.0);
        assert_eq!(resize.update(0.0), &[50.0, 100.0]);
    }

    #[test]
    fn test_finish_commits_widths() {
        let config = TableConfig::default();
        let mut resize = ColumnResize::begin(1, 200.0, vec![100.0, 100.0], &config).unwrap();
        resize.update(230.0);

        assert_eq!(
            resize.finish(),
            Some(TableMutation::SetColumnWidths {
                widths: Some(vec![100.0, 130.0])
            })
        );
    }

    #[test]
    fn test_unchanged_or_cancelled_commits_nothing() {
        let config = TableConfig::default();
        let resize = ColumnResize::begin(0, 100.0, vec![100.0], &config).unwrap();
        assert_eq!(resize.finish(), None);

        let mut resize = ColumnResize::begin(0, 100.0, vec![100.0], &config).unwrap();
        resize.update(300.0);
        assert_eq!(resize.cancel(), vec![100.0]);
    }

    #[test]
    fn test_hit_area_is_wider_than_line() {
        let widths = [100.0, 150.0];
        assert_eq!(hit_test(&widths, 104.0, 6.0), Some(0));
        assert_eq!(hit_test(&widths, 247.0, 6.0), Some(1));
        assert_eq!(hit_test(&widths, 120.0, 6.0), None);
    }
}
