//! Clipboard interchange for cell ranges
//!
//! Copy writes an HTML `<table>` (for spreadsheets and other editors) plus a
//! tab/newline rendering. Paste reads the first `<table>` out of `text/html`
//! with a tolerant scan; HTML without a table falls back to `text/plain`,
//! which is treated as a grid when it contains tabs.

use crate::model::{BlockRef, CellAddr, CellContent, CellData, CellRange, Grid, SavedBlock};
use regex::Regex;
use std::sync::OnceLock;
use tablekit_editor::{paragraph_data, Document, PARAGRAPH};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipboardPayload {
    /// `text/html`
    pub html: String,
    /// `text/plain`
    pub plain: String,
}

/// What a paste carries, as far as tables are concerned
#[derive(Debug, Clone, PartialEq)]
pub enum PasteContent {
    /// Rectangular cell matrix (rows may be jagged)
    Table(Vec<Vec<CellContent>>),
    /// Ordinary text for in-block pasting
    Text(String),
}

macro_rules! regex {
    ($pattern:literal) => {{
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

/// Render a range for the clipboard
pub fn copy(grid: &Grid, range: CellRange, doc: &Document) -> ClipboardPayload {
    let Some(range) = range.clamp(grid.row_count(), grid.col_count()) else {
        return ClipboardPayload::default();
    };

    let mut html = String::from("<table>");
    let mut plain_rows = Vec::with_capacity(range.row_count());

    for row in range.min_row..=range.max_row {
        html.push_str("<tr>");
        let mut plain_cells = Vec::with_capacity(range.col_count());

        for col in range.min_col..=range.max_col {
            let Some(cell) = grid.cell(CellAddr::new(row, col)) else {
                continue;
            };
            let texts = cell.texts(doc);
            let heading = (grid.with_headings && row == 0) || (grid.with_heading_column && col == 0);
            let tag = if heading { "th" } else { "td" };

            html.push('<');
            html.push_str(tag);
            let style = cell_style(cell.color.as_deref(), cell.text_color.as_deref());
            if !style.is_empty() {
                html.push_str(&format!(" style=\"{}\"", escape(&style)));
            }
            html.push('>');
            let escaped: Vec<String> = texts.iter().map(|t| escape(t)).collect();
            html.push_str(&escaped.join("<br>"));
            html.push_str(&format!("</{tag}>"));

            plain_cells.push(texts.join(" ").replace(['\t', '\n'], " "));
        }

        html.push_str("</tr>");
        plain_rows.push(plain_cells.join("\t"));
    }
    html.push_str("</table>");

    ClipboardPayload {
        html,
        plain: plain_rows.join("\n"),
    }
}

/// Read clipboard data offered as `text/html` and/or `text/plain`
pub fn parse(html: Option<&str>, plain: Option<&str>) -> Option<PasteContent> {
    if let Some(cells) = html.and_then(parse_html_table) {
        return Some(PasteContent::Table(cells));
    }
    let plain = plain?;
    if plain.contains('\t') {
        return Some(PasteContent::Table(parse_plain_grid(plain)));
    }
    Some(PasteContent::Text(plain.to_string()))
}

fn parse_html_table(html: &str) -> Option<Vec<Vec<CellContent>>> {
    let table = regex!(r"(?is)<table\b[^>]*>(.*?)</table\s*>").captures(html)?;
    let body = table.get(1)?.as_str();

    let rows: Vec<Vec<CellContent>> = regex!(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>")
        .captures_iter(body)
        .filter_map(|row| row.get(1))
        .map(|row| {
            regex!(r"(?is)<t[dh]\b([^>]*)>(.*?)</t[dh]\s*>")
                .captures_iter(row.as_str())
                .map(|cell| {
                    let attrs = cell.get(1).map_or("", |m| m.as_str());
                    let inner = cell.get(2).map_or("", |m| m.as_str());
                    html_cell(attrs, inner)
                })
                .collect()
        })
        .filter(|row: &Vec<CellContent>| !row.is_empty())
        .collect();

    (!rows.is_empty()).then_some(rows)
}

fn html_cell(attrs: &str, inner: &str) -> CellContent {
    let breaks = regex!(r"(?i)<br\s*/?>|</p\s*>|</div\s*>");
    let tags = regex!(r"<[^>]*>");

    let mut lines: Vec<String> = breaks
        .split(inner)
        .map(|line| decode_entities(&tags.replace_all(line, "")).trim().to_string())
        .collect();
    // A closing </p> leaves an empty tail
    while lines.len() > 1 && lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    let (color, text_color) = parse_style(attrs);
    CellContent::Cell(CellData {
        blocks: lines
            .into_iter()
            .map(|text| {
                BlockRef::Saved(SavedBlock {
                    id: None,
                    tool: PARAGRAPH.to_string(),
                    data: paragraph_data(&text),
                })
            })
            .collect(),
        color,
        text_color,
    })
}

fn parse_style(attrs: &str) -> (Option<String>, Option<String>) {
    let Some(style) = regex!(r#"(?i)style\s*=\s*"([^"]*)""#)
        .captures(attrs)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str()))
    else {
        return (None, None);
    };

    let declaration = |re: &Regex| {
        re.captures(&style)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty())
    };
    (
        declaration(regex!(r"(?i)background(?:-color)?\s*:\s*([^;]+)")),
        declaration(regex!(r"(?i)(?:^|;)\s*color\s*:\s*([^;]+)")),
    )
}

fn parse_plain_grid(plain: &str) -> Vec<Vec<CellContent>> {
    let mut lines: Vec<&str> = plain.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    if lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
        .into_iter()
        .map(|line| line.split('\t').map(|c| CellContent::Text(c.to_string())).collect())
        .collect()
}

fn cell_style(color: Option<&str>, text_color: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(color) = color {
        parts.push(format!("background-color: {color}"));
    }
    if let Some(text_color) = text_color {
        parts.push(format!("color: {text_color}"));
    }
    parts.join("; ")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(content: &CellContent) -> Vec<String> {
        match content {
            CellContent::Text(text) => vec![text.clone()],
            CellContent::Cell(cell) => cell
                .blocks
                .iter()
                .map(|b| match b {
                    BlockRef::Saved(saved) => saved.data["text"].as_str().unwrap_or_default().to_string(),
                    BlockRef::Id(id) => id.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_spreadsheet_html() {
        let html = r#"<meta charset="utf-8"><table><tbody>
            <tr><td style="background-color: #ff0; color: red">a &amp; b</td><td><p>x</p><p>y</p></td></tr>
            <tr><th>c<br/>d</th><td></td></tr>
        </tbody></table>"#;

        let Some(PasteContent::Table(rows)) = parse(Some(html), Some("ignored")) else {
            panic!("expected a table");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(texts(&rows[0][0]), vec!["a & b"]);
        assert_eq!(texts(&rows[0][1]), vec!["x", "y"]);
        assert_eq!(texts(&rows[1][0]), vec!["c", "d"]);
        assert_eq!(texts(&rows[1][1]), vec![""]);

        let CellContent::Cell(first) = &rows[0][0] else {
            panic!("expected object cell");
        };
        assert_eq!(first.color.as_deref(), Some("#ff0"));
        assert_eq!(first.text_color.as_deref(), Some("red"));
    }

    #[test]
    fn test_html_without_table_falls_back_to_plain() {
        let content = parse(Some("<p>hello</p>"), Some("hello"));
        assert_eq!(content, Some(PasteContent::Text("hello".into())));
    }

    #[test]
    fn test_tabbed_plain_text_is_a_grid() {
        let Some(PasteContent::Table(rows)) = parse(None, Some("a\tb\r\nc\td\n")) else {
            panic!("expected a table");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], CellContent::Text("d".into()));
    }

    #[test]
    fn test_style_and_escape_helpers() {
        assert_eq!(cell_style(Some("red"), None), "background-color: red");
        assert_eq!(escape("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(parse_style(r#"style="color: blue""#), (None, Some("blue".into())));
    }
}
