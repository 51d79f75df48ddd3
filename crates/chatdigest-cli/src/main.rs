mod cli;
mod commands;
mod completions;
mod config;
mod error;
mod setup;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::Settings;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Credentials may live in a .env file next to the bot; real env vars win
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(Commands::Completions { shell }) = cli.command {
        completions::generate_completions(shell);
        return Ok(());
    }

    // Keep the guard alive so buffered log lines are flushed on exit
    let _guard = init_logging(cli.verbose, cli.log_dir.as_deref())?;

    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_overrides(&cli.overrides, std::env::var("LLM_API_KEY").ok())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(&settings).await,
        Commands::Check => commands::check::run(&settings).await,
        Commands::Config { command } => {
            commands::config::run(&settings, cli.config.as_deref(), command)
        }
        Commands::Completions { .. } => Ok(()),
    }
}

fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_filter = if verbose {
        "info,chatdigest=debug,chatdigest_core=debug,chatdigest_ai=debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "chatdigest.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            builder.with_writer(non_blocking).with_ansi(false).init();
            Ok(Some(guard))
        }
        None => {
            builder.with_writer(std::io::stderr).init();
            Ok(None)
        }
    }
}
