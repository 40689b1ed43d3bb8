use crate::error::TableResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "tablekit.config.json";

/// Table tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfig {
    /// Rows of a table created from empty data
    pub default_rows: usize,

    /// Columns of a table created from empty data
    pub default_cols: usize,

    /// Narrowest width a column can be resized to (px)
    pub min_column_width: f64,

    /// Width used when no neighbouring width is known (px)
    pub default_column_width: f64,

    /// Pointer travel separating a drag from a click (px)
    pub drag_threshold: f64,

    /// Fraction of the average column width one drag step covers
    pub column_unit_ratio: f64,

    /// Row height used as drag step until the host measures one (px)
    pub row_unit: f64,

    /// Distance from the table edge at which add buttons appear (px)
    pub edge_proximity: f64,

    /// Extra hit area on each side of a resize handle (px)
    pub resize_hit_slop: f64,

    /// Undo levels kept by documents the CLI loads
    pub max_undo_levels: usize,

    /// Show the add-row/add-column buttons without hovering
    pub always_show_add_controls: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_rows: 3,
            default_cols: 3,
            min_column_width: 50.0,
            default_column_width: 150.0,
            drag_threshold: 5.0,
            column_unit_ratio: 0.5,
            row_unit: 36.0,
            edge_proximity: 40.0,
            resize_hit_slop: 6.0,
            max_undo_levels: 100,
            always_show_add_controls: false,
        }
    }
}

impl TableConfig {
    /// Load config from a directory, falling back to defaults
    pub fn load(dir: impl AsRef<Path>) -> TableResult<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: TableConfig = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "Loaded table config");
            Ok(config)
        } else {
            Ok(TableConfig::default())
        }
    }
}
