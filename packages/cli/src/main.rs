mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, inspect, render, ApplyArgs, InspectArgs, RenderArgs};

/// Tablekit CLI - inspect and edit tables in saved documents
#[derive(Parser, Debug)]
#[command(name = "tablekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every table of a document
    Render(RenderArgs),

    /// Run a mutation script against a table, one undo step per mutation
    Apply(ApplyArgs),

    /// Summarize the tables of a document or directory of documents
    Inspect(InspectArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Render(args) => render(args),
        Command::Apply(args) => apply(args),
        Command::Inspect(args) => inspect(args),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
