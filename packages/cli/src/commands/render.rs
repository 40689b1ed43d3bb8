use super::{load_document, table_ids};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tablekit_editor::Document;
use tablekit_table::{clipboard, TableTool, TableView};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Saved document (JSON array of blocks)
    pub file: PathBuf,

    /// Print each table as HTML instead of text
    #[arg(long)]
    pub html: bool,
}

pub fn render(args: RenderArgs) -> Result<()> {
    let (mut doc, config) = load_document(&args.file)?;
    let tables = table_ids(&doc);

    if tables.is_empty() {
        println!("{}", "No tables found".yellow());
        return Ok(());
    }

    for id in tables {
        let tool = TableTool::open(&mut doc, id, config.clone())?;
        if args.html {
            if let Some(range) = tool.grid().full_range() {
                println!("{}", clipboard::copy(tool.grid(), range, &doc).html);
            }
            continue;
        }

        println!("{} {}", "Table".bright_blue().bold(), tool.id());
        print_grid(&tool.render(), &doc);
        println!();
    }

    Ok(())
}

fn print_grid(view: &TableView, doc: &Document) {
    let rows: Vec<Vec<(String, bool)>> = view
        .rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .map(|cell| {
                    let text = cell
                        .blocks
                        .iter()
                        .filter_map(|id| doc.block(id))
                        .map(|b| b.text().to_string())
                        .collect::<Vec<_>>()
                        .join(" / ");
                    (text, cell.heading)
                })
                .collect()
        })
        .collect();

    let cols = rows.first().map_or(0, Vec::len);
    let widths: Vec<usize> = (0..cols)
        .map(|c| rows.iter().map(|r| r[c].0.chars().count()).max().unwrap_or(0).max(1))
        .collect();

    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|((text, heading), &width)| {
                let padded = format!("{text:<width$}");
                if *heading {
                    padded.bold().to_string()
                } else {
                    padded
                }
            })
            .collect();
        println!("| {} |", line.join(" | "));
    }
}
