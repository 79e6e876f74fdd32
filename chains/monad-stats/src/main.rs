use anyhow::Result;
use clap::{Parser, Subcommand};
use core_logic::{setup_logger, CheckerConfig, RunMetrics};
use dialoguer::{theme::ColorfulTheme, Select};
use dotenv::dotenv;
use monad_stats::{app, config};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Monad testnet wallet stats checker", long_about = None)]
struct Args {
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,
    /// Write run metrics as JSON to this path when the run ends
    #[arg(short, long)]
    export_metrics: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Check every wallet, reconcile failures and export the report
    Run,
    /// Rebuild the report from stored records
    Export,
    /// Delete all stored wallet records
    Clear,
}

const MENU_ITEMS: [&str; 3] = ["Start stats MONAD", "Clear wallet json data", "Exit"];

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let config = config::load(&args.config)?;
    let _log_guard = setup_logger(&config.paths.logs_dir)?;
    info!("Loaded config from: {}", args.config);

    let metrics = Arc::new(RunMetrics::default());

    match args.command {
        Some(command) => execute(command, &config, metrics.clone()).await?,
        None => loop {
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("What do you want to do?")
                .items(&MENU_ITEMS)
                .default(0)
                .interact()?;

            match selection {
                0 => execute(Command::Run, &config, metrics.clone()).await?,
                1 => execute(Command::Clear, &config, metrics.clone()).await?,
                _ => break,
            }
        },
    }

    if let Some(path) = &args.export_metrics {
        match metrics.export_to_file(path).await {
            Ok(()) => info!(target: "run_summary", "Metrics exported to {}", path),
            Err(e) => error!("Metrics export failed: {}", e),
        }
    }

    Ok(())
}

async fn execute(command: Command, config: &CheckerConfig, metrics: Arc<RunMetrics>) -> Result<()> {
    match command {
        Command::Run => {
            let cancel = CancellationToken::new();
            let ctrl_c = spawn_ctrl_c_listener(cancel.clone());
            let result = app::run_stats(config, metrics, &cancel).await;
            ctrl_c.abort();

            let summary = result?;
            info!(
                target: "run_summary",
                "Done: {} success | {} recovered | {} permanently failed",
                summary.counts.success,
                summary.reconcile.recovered.len(),
                summary.reconcile.permanently_failed.len()
            );
        }
        Command::Export => {
            let rows = app::export_only(config).await?;
            info!(target: "run_summary", "Report written with {} rows", rows);
        }
        Command::Clear => {
            app::clear(config).await?;
        }
    }
    Ok(())
}

fn spawn_ctrl_c_listener(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!(target: "run_summary", "Received Ctrl+C. Cancelling run, stored results are kept...");
                token.cancel();
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
            }
        }
    })
}
