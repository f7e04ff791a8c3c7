///
/// This module implements the CLI interface for bucket-mirror: command parsing,
/// argument validation, and the async entrypoint used by `main` and integration tests.
///
/// All reconciliation logic lives in the [`bucket-mirror-core`] crate.
/// This module is strictly CLI glue: config loading, client construction,
/// signal handling and result reporting.
///
/// ## How To Use
/// - For command-line users: run the `bucket-mirror` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`bucket-mirror-core`]: ../../bucket-mirror-core/
use crate::load_config::load_config;
use crate::logging::{parse_log_format, LogFormat};
use crate::storage::S3ObjectStore;
use anyhow::Result;
use bucket_mirror_core::progress::ProgressDisplay;
use bucket_mirror_core::schedule::{shutdown_channel, Shutdown};
use bucket_mirror_core::synchronise::{Reconciler, SyncMode};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::instrument::WithSubscriber;
use tracing::Dispatch;

/// CLI for bucket-mirror: keep a local directory in sync with an S3-compatible bucket.
#[derive(Parser)]
#[clap(
    name = "bucket-mirror",
    version,
    about = "Download every object of an S3-compatible bucket that is missing from a local directory"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Log line format: `text` or `json`
    #[clap(
        long,
        global = true,
        env = "SYNC_LOGGER",
        default_value = "text",
        value_parser = parse_log_format
    )]
    pub log_format: LogFormat,

    /// Do not draw per-object progress bars
    #[clap(long, global = true)]
    pub no_progress: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download missing objects once and exit
    Sync {
        #[clap(flatten)]
        config: ConfigArgs,
    },
    /// Keep polling the bucket and download new objects until interrupted
    Watch {
        #[clap(flatten)]
        config: ConfigArgs,

        /// Seconds between passes (overrides `pollInterval`)
        #[clap(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Path to the YAML config file
    #[clap(long, default_value = "config.yaml")]
    pub config: PathBuf,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
///
/// Every event, including those of the reconciler, goes to `logger`.
pub async fn run(cli: Cli, logger: Dispatch) -> Result<()> {
    execute(cli, logger.clone()).with_subscriber(logger).await
}

async fn execute(cli: Cli, logger: Dispatch) -> Result<()> {
    tracing::info!("bucket-mirror starting");

    let (mode, config_path, interval) = match cli.command {
        Commands::Sync { config } => (SyncMode::Once, config.config, None),
        Commands::Watch { config, interval } => (SyncMode::Continuous, config.config, interval),
    };

    let mut config = load_config(&config_path)?;
    if let Some(secs) = interval {
        config.poll_interval = Duration::from_secs(secs);
    }
    if cli.no_progress {
        config.progress = ProgressDisplay::Hidden;
    }
    config.trace_loaded();

    let store = S3ObjectStore::from_config(&config.storage).map_err(|e| {
        tracing::error!(error = %e, "Failed to construct storage client");
        anyhow::anyhow!("Failed to construct storage client: {e}")
    })?;

    let reconciler = Reconciler::new(store, config).with_logger(logger);

    tracing::info!(?mode, "Starting reconciliation");
    match reconciler.run(mode, shutdown_on_signal()).await {
        Ok(report) => {
            tracing::info!(
                downloaded = report.downloaded.len(),
                failed = report.failed.len(),
                "Reconciliation complete"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Reconciliation failed");
            Err(e.into())
        }
    }
}

/// A shutdown signal that fires on Ctrl+C or SIGTERM. The listener logs to the caller's logger.
fn shutdown_on_signal() -> Shutdown {
    let (trigger, shutdown) = shutdown_channel();

    tokio::spawn(async move {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received Ctrl+C, initiating shutdown"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM, initiating shutdown");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        trigger.trigger();
    }
    .with_current_subscriber());

    shutdown
}
