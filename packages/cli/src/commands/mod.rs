pub mod apply;
pub mod inspect;
pub mod render;

pub use apply::{apply, ApplyArgs};
pub use inspect::{inspect, InspectArgs};
pub use render::{render, RenderArgs};

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use tablekit_editor::{BlockId, Document};
use tablekit_table::{TableConfig, TOOL_NAME};

/// Read a saved document and the table config next to it
pub fn load_document(path: &Path) -> Result<(Document, TableConfig)> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let config = TableConfig::load(dir)?;

    let json = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let doc = Document::from_json_with_levels(&json, config.max_undo_levels)
        .with_context(|| format!("Invalid document {}", path.display()))?;
    tracing::debug!(path = %path.display(), blocks = doc.len(), "Loaded document");
    Ok((doc, config))
}

/// Top-level table blocks in document order
pub fn table_ids(doc: &Document) -> Vec<BlockId> {
    doc.top_level()
        .iter()
        .filter(|id| doc.block(id).is_some_and(|b| b.tool == TOOL_NAME))
        .cloned()
        .collect()
}

/// The requested table, or the first one
pub fn pick_table(doc: &Document, wanted: Option<&str>) -> Result<BlockId> {
    let tables = table_ids(doc);
    match wanted {
        Some(id) => tables
            .into_iter()
            .find(|t| t.as_str() == id)
            .ok_or_else(|| anyhow!("No table with id {id}")),
        None => tables.into_iter().next().ok_or_else(|| anyhow!("Document has no tables")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tablekit_editor::PopoverRegistry;
    use tablekit_table::{MemoryHost, Position, TableMutation, TableTool, ToolContext};

    const DOC: &str = r#"[
        { "id": "p1", "type": "paragraph", "data": { "text": "intro" } },
        { "id": "t1", "type": "table", "data": { "content": [["a", "b"]] } },
        { "id": "t2", "type": "table", "data": { "content": [["c"]] } }
    ]"#;

    #[test]
    fn test_load_document_with_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, DOC).unwrap();
        fs::write(
            dir.path().join(tablekit_table::DEFAULT_CONFIG_NAME),
            r#"{ "defaultColumnWidth": 90 }"#,
        )
        .unwrap();

        let (doc, config) = load_document(&path).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(config.default_column_width, 90.0);
    }

    #[test]
    fn test_config_limits_undo_levels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, DOC).unwrap();
        fs::write(dir.path().join(tablekit_table::DEFAULT_CONFIG_NAME), r#"{ "maxUndoLevels": 1 }"#).unwrap();

        let (mut doc, config) = load_document(&path).unwrap();
        assert_eq!(config.max_undo_levels, 1);
        let mut tool = TableTool::open(&mut doc, BlockId::new("t1"), config).unwrap();
        let mut host = MemoryHost::new();
        let mut menus = PopoverRegistry::new();
        let mut cx = ToolContext::new(&mut doc, &mut host, &mut menus);
        for index in 0..2 {
            let mutation = TableMutation::InsertRow {
                index,
                position: Position::After,
            };
            tool.execute(&mut cx, mutation).unwrap();
        }

        assert_eq!(doc.undo_levels(), 1);
    }

    #[test]
    fn test_pick_table() {
        let doc = Document::from_json(DOC).unwrap();
        assert_eq!(table_ids(&doc).len(), 2);
        assert_eq!(pick_table(&doc, None).unwrap().as_str(), "t1");
        assert_eq!(pick_table(&doc, Some("t2")).unwrap().as_str(), "t2");
        assert!(pick_table(&doc, Some("p1")).is_err());
    }
}
