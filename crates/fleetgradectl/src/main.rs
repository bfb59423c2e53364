//! Fleetgrade Control - CLI front end for the report grader
//!
//! Scans AIDA64 report directories, keeps results in SQLite and writes
//! the spreadsheet deliverables.

use anyhow::{Context as _, Result};
use clap::Parser;
use fleetgrade_common::{CancelToken, FleetConfig};
use fleetgradectl::cli::{Cli, Commands};
use fleetgradectl::commands::{self, Context};
use fleetgradectl::{errors, logging};
use owo_colors::OwoColorize;
use tracing::{debug, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            errors::EXIT_GENERAL_ERROR
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let (config, config_path) = FleetConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let log_file = cli.log_file.clone().or_else(|| config.settings.log_filename.clone());
    logging::init(cli.verbose, log_file.as_deref())?;
    match &config_path {
        Some(path) => debug!("configuration loaded from {}", path.display()),
        None => debug!("no configuration file, using defaults"),
    }

    let ctx = Context::new(config, config_path);

    match cli.command {
        Commands::Scan(args) => {
            let cancel = CancelToken::new();
            let watcher = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, stopping after the current report");
                    watcher.cancel();
                }
            });

            tokio::task::spawn_blocking(move || commands::scan(&ctx, &args, &cancel))
                .await
                .context("scan task panicked")?
        }
        Commands::Export(args) => commands::export(&ctx, &args),
        Commands::Set(args) => commands::set(&ctx, &args),
        Commands::List(args) => commands::list(&ctx, &args),
        Commands::Show(args) => commands::show(&ctx, &args),
        Commands::Config { action } => commands::config(&ctx, &action),
    }
}
