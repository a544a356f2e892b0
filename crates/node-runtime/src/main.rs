//! `mergemock` entry point.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use mock_telemetry::{init_telemetry, TelemetryConfig};
use node_runtime::cli::Cli;
use node_runtime::Launch;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::for_service(cli.command.service_name());
    if let Some(level) = &cli.log_level {
        telemetry = telemetry.with_log_level(level.clone());
    }
    if let Err(err) = init_telemetry(&telemetry) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let launch = Launch::resolve(&cli).context("Failed to load configuration")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "Unable to listen for Ctrl-C");
            // Keep the sender alive so the service is not told to stop.
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl-C, shutting down");
        let _ = shutdown_tx.send(true);
    });

    launch.run(shutdown_rx).await
}
