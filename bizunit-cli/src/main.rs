use bizunit_core::config::LogConfig;
use clap::Parser;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;
mod utils;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "bizunit", version, about = "Bizunit integration plan runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

async fn run_command(command: Command) -> i32 {
    // `run` installs tracing from its own configuration.
    if !matches!(command, Command::Run { .. }) {
        bizunit_exec::init_tracing(&LogConfig::default());
    }
    match command {
        Command::Validate { path, output } => cmd::validate::validate_cmd(&path, output).await,
        Command::Template { path, output } => cmd::template::template_cmd(&path, output).await,
        Command::Run {
            path,
            request,
            account,
            runtime,
            output,
        } => cmd::run::run_cmd(&path, request.as_deref(), account, runtime, output).await,
        Command::Publish {
            path,
            store,
            output,
        } => cmd::publish::publish_cmd(&path, store, output).await,
        Command::Show {
            name,
            store,
            output,
        } => cmd::show::show_cmd(name.as_deref(), store, output).await,
        Command::Migrate {
            store,
            max_connections,
            output,
        } => cmd::migrate::migrate_cmd(store, max_connections, output).await,
    }
}
