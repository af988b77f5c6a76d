use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a plan document against the block catalog.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Build the block tree and print it re-serialized.
    Template {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Execute a plan once against an origin request.
    Run {
        path: PathBuf,
        /// JSON or YAML origin request: method, path, query, header, body.
        #[arg(long)]
        request: Option<PathBuf>,
        /// Account the run acts for. Anonymous when absent.
        #[arg(long)]
        account: Option<String>,
        #[command(flatten)]
        runtime: RuntimeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Store a validated plan under its name.
    Publish {
        path: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print a published plan, or list them all when no name is given.
    Show {
        name: Option<String>,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Create or update the plan store schema.
    Migrate {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long, default_value_t = 5)]
        max_connections: u32,
        #[command(flatten)]
        output: OutputArgs,
    },
}
