//! `vorpal` 바이너리 진입점.

use anyhow::Result;
use clap::Parser;

use vorpal::infrastructure::config::{load_merged_config, read_config};
use vorpal::interface::cli::{Cli, CliAction, demo, run_batch, run_repl};
use vorpal::interface::composition::console_shell;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_merged_config()?.config;
    if let Some(path) = cli.config_path() {
        config.merge_from(read_config(path)?);
    }
    config.merge_from(cli.overrides());

    let shell = console_shell(config)?;
    demo::register(&shell.vorpal)?;

    match cli.action() {
        CliAction::Interactive => run_repl(&shell).await,
        CliAction::Exec(commands) => run_batch(&shell.vorpal, &commands).await,
    }
}
