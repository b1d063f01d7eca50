//! MXF Breakout - Main Entry Point
//!
//! Evaluates the configured futures contracts against their session
//! baseline, either once per invocation or in a polling loop.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use mxf_breakout::config::{load_config, AppConfig};
use mxf_breakout::store::{InMemoryPositionStore, PgPositionStore, PositionStore, PositionTracker};
use mxf_breakout::strategy::EvaluationMode;
use mxf_breakout::trader::{shutdown_on_ctrl_c, Evaluator, Scheduler};
use mxf_breakout::{notify, BrokerRestClient};

/// CLI arguments for the application
///
/// Without a subcommand the targets are polled until Ctrl-C.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Push one combined report and exit
    #[arg(long)]
    once: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Open a position on a breakout
    Entry,
    /// Close open positions that hit the stop-loss
    Monitor,
    /// Close every open position
    Exit,
}

impl From<Command> for EvaluationMode {
    fn from(command: Command) -> Self {
        match command {
            Command::Entry => EvaluationMode::Entry,
            Command::Monitor => EvaluationMode::Monitor,
            Command::Exit => EvaluationMode::Exit,
        }
    }
}

fn init_tracing(default_level: &str, json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let base = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(base.json())
            .init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(base).init();
    }
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn PositionStore>> {
    Ok(match &config.database {
        Some(db) => Arc::new(
            PgPositionStore::connect(db)
                .await
                .context("failed to connect to the position database")?,
        ),
        None => {
            info!("No database configured, positions are kept in memory");
            Arc::new(InMemoryPositionStore::new())
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = std::env::var("APP_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = load_config(Some(&config_path)).context("failed to load configuration")?;

    let json_logs = std::env::var("APP_LOG_JSON").map(|v| !v.is_empty()).unwrap_or(false);
    init_tracing(&config.settings.log_level, json_logs);

    info!(
        config = %config_path,
        targets = ?config.settings.targets,
        simulation = config.broker.simulation,
        "Starting MXF breakout monitor"
    );

    let broker = BrokerRestClient::from_config(&config.broker)?;
    broker.login().await.context("brokerage login failed")?;

    let notifier = notify::from_config(&config.notify)?;
    let tracker = PositionTracker::new(open_store(&config).await?);
    let evaluator = Evaluator::new(
        Arc::new(broker),
        notifier,
        tracker,
        config.strategy.clone(),
    )?;

    let scheduler = Scheduler::new(
        Arc::new(evaluator),
        config.settings.targets.clone(),
        Duration::from_secs(config.settings.poll_interval_seconds),
    );

    match (args.command, args.once) {
        (_, true) => {
            scheduler.run_report().await;
        }
        (Some(command), false) => {
            let mode = EvaluationMode::from(command);
            info!(%mode, "Running single pass");
            scheduler.run_pass(mode).await;
        }
        (None, false) => {
            scheduler.run(shutdown_on_ctrl_c()).await;
        }
    }

    info!("Done");
    Ok(())
}
