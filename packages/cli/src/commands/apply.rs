use super::{load_document, pick_table};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use tablekit_editor::PopoverRegistry;
use tablekit_table::{MemoryHost, TableMutation, TableTool, ToolContext};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Saved document (JSON array of blocks)
    pub file: PathBuf,

    /// Mutation script (JSON array of mutations)
    pub script: PathBuf,

    /// Table block to edit (defaults to the first table)
    #[arg(short, long)]
    pub table: Option<String>,

    /// Undo this many steps after the script ran
    #[arg(long, default_value = "0")]
    pub undo: usize,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn apply(args: ApplyArgs) -> Result<()> {
    let (mut doc, config) = load_document(&args.file)?;
    let script = fs::read_to_string(&args.script)
        .with_context(|| format!("Cannot read {}", args.script.display()))?;
    let mutations: Vec<TableMutation> =
        serde_json::from_str(&script).with_context(|| format!("Invalid script {}", args.script.display()))?;

    let id = pick_table(&doc, args.table.as_deref())?;
    let mut tool = TableTool::open(&mut doc, id, config)?;
    let mut host = MemoryHost::new();
    let mut menus = PopoverRegistry::new();
    let mut cx = ToolContext::new(&mut doc, &mut host, &mut menus);
    tool.mount(cx.host);

    for (step, mutation) in mutations.into_iter().enumerate() {
        let name = mutation.name();
        let applied = tool.execute(&mut cx, mutation)?;
        eprintln!(
            "   {} {:>2} {} ({})",
            if applied.is_changed() { "✓".green() } else { "·".dimmed() },
            step + 1,
            name,
            if applied.is_changed() { "changed" } else { "no-op" }
        );
    }

    for _ in 0..args.undo {
        match tool.undo(&mut cx)? {
            Some(outcome) => eprintln!("   {} undo {}", "↶".yellow(), outcome.origin.label()),
            None => {
                eprintln!("   {}", "Nothing left to undo".yellow());
                break;
            }
        }
    }

    let grid = tool.grid();
    tracing::info!(rows = grid.row_count(), cols = grid.col_count(), "Script applied");

    let json = doc.to_json()?;
    match args.out {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("Cannot write {}", path.display()))?;
            eprintln!("✨ {} {}", "Wrote".green().bold(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
