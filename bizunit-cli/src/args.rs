use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Postgres URL of the plan store. Falls back to BIZUNIT_STORE_URL, then DATABASE_URL.
    #[arg(long)]
    pub store: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RuntimeArgs {
    /// YAML runtime configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Overrides `app_env` from the configuration.
    #[arg(long)]
    pub env: Option<String>,
    /// Base directory for `file://` secret references. Defaults to the configuration's directory.
    #[arg(long)]
    pub secrets_dir: Option<PathBuf>,
}
