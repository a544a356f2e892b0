//! # MergeMock Runtime
//!
//! Wiring behind the `mergemock` binary. Each subcommand owns one service:
//!
//! | Subcommand  | Service                                   | Stops on            |
//! |-------------|-------------------------------------------|---------------------|
//! | `relay`     | `RelayServer` (builder API + engine API)  | Ctrl-C              |
//! | `consensus` | `ConsensusDriver`                         | Ctrl-C or slot bound|

pub mod cli;

use anyhow::{Context, Result};
use mm_03_builder_relay::{RelayConfig, RelayServer};
use mm_04_consensus_driver::{ConsensusDriver, DriverConfig, RunOutcome};
use shared_crypto::BlsKeyPair;
use tokio::sync::watch;
use tracing::info;

use crate::cli::{Cli, Command, FileConfig};

/// Resolved configuration of one invocation.
#[derive(Debug)]
pub enum Launch {
    Relay(RelayConfig),
    Consensus(DriverConfig),
}

impl Launch {
    /// Merge the config file with the flags of the chosen subcommand.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = FileConfig::load(cli.config.as_deref())?;
        Ok(match &cli.command {
            Command::Relay(args) => {
                let mut config = file.relay;
                args.apply(&mut config);
                Launch::Relay(config)
            }
            Command::Consensus(args) => {
                let mut config = file.consensus;
                args.apply(&mut config);
                Launch::Consensus(config)
            }
        })
    }

    /// Run until `shutdown` flips or the service finishes on its own.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        match self {
            Launch::Relay(config) => {
                config.validate().context("Invalid relay configuration")?;
                let keypair = BlsKeyPair::generate().context("Failed to generate relay key")?;
                let server = RelayServer::bind(&config, keypair)
                    .await
                    .context("Failed to start relay")?;
                server.serve(shutdown).await.context("Relay server failed")?;
            }
            Launch::Consensus(config) => {
                let driver = ConsensusDriver::connect(config)
                    .await
                    .context("Failed to start consensus driver")?;
                match driver.run(shutdown).await.context("Consensus driver failed")? {
                    RunOutcome::Completed { slots } => info!(slots, "Slot bound reached"),
                    RunOutcome::Interrupted => info!("Consensus driver interrupted"),
                }
            }
        }
        Ok(())
    }
}
