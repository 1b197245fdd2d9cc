use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// REST service over a stock-ticker database.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file; defaults to `config.toml` in the working directory.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (the default).
    Serve,
    /// Create the ticker tables.
    CreateTables,
    /// Drop the ticker tables and all their rows.
    DeleteTables,
    /// Bulk-load companies and their values.
    WriteAllTickerValues(WriteArgs),
}

#[derive(Debug, clap::Args)]
pub struct WriteArgs {
    /// JSON file to load instead of the bundled sample dataset.
    #[arg(long)]
    pub file: Option<PathBuf>,
}
