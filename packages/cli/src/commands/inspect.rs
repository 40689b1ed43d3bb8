use super::{load_document, table_ids};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tablekit_table::TableData;
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Saved document, or a directory of them
    pub path: PathBuf,
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let files = if args.path.is_file() {
        vec![args.path.clone()]
    } else if args.path.is_dir() {
        find_documents(&args.path)
    } else {
        return Err(anyhow!("Path does not exist: {}", args.path.display()));
    };

    let mut failed = 0;
    for file in &files {
        if let Err(err) = inspect_file(file) {
            println!("{} {}: {}", "✗".red(), file.display(), err);
            failed += 1;
        }
    }

    println!();
    println!("   Documents checked: {}", files.len());
    if failed > 0 {
        return Err(anyhow!("{failed} document(s) could not be read"));
    }
    Ok(())
}

fn inspect_file(file: &Path) -> Result<()> {
    let (doc, _) = load_document(file)?;
    let tables = table_ids(&doc);
    println!("{} ({} tables)", file.display().to_string().bold(), tables.len());

    for id in tables {
        let Some(block) = doc.block(&id) else { continue };
        let data = TableData::from_value(&block.data)?;
        let rows = data.content.len();
        let cols = data.content.iter().map(Vec::len).max().unwrap_or(0);
        let jagged = data.content.iter().any(|r| r.len() != cols);

        let mut flags = Vec::new();
        if data.with_headings {
            flags.push("heading row");
        }
        if data.with_heading_column {
            flags.push("heading column");
        }
        if data.col_widths.is_some() {
            flags.push("fixed widths");
        }

        println!(
            "   {} {} {}x{}{}{}",
            "✓".green(),
            id,
            rows,
            cols,
            if flags.is_empty() { String::new() } else { format!(" [{}]", flags.join(", ")) },
            if jagged { " (jagged, normalized on open)".yellow().to_string() } else { String::new() }
        );
    }
    Ok(())
}

fn find_documents(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "json"))
        .filter(|e| e.file_name() != tablekit_table::DEFAULT_CONFIG_NAME)
        .map(|e| e.into_path())
        .collect()
}
