//! Command line surface.
//!
//! Precedence: CLI flags, then the `--config` TOML file, then defaults.
//!
//! ```toml
//! [relay]
//! listen_addr = "0.0.0.0:28545"
//! request_timeout = "30s"
//!
//! [consensus]
//! slot_time = "6s"
//! slot_bound = 20
//! [consensus.behavior]
//! gap_freq = 0.1
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use humantime::parse_duration;
use mm_03_builder_relay::{RelayConfig, SessionMode};
use mm_04_consensus_driver::DriverConfig;
use serde::Deserialize;
use shared_types::Hash;

/// Merge testing mocks: a builder relay with a co-hosted engine, and a
/// slot-driven consensus client.
#[derive(Parser, Debug)]
#[command(name = "mergemock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file with `[relay]` and `[consensus]` tables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `mm_04_consensus_driver=trace`
    #[arg(long, global = true, env = "MM_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the mock builder relay and its engine endpoint
    Relay(RelayArgs),
    /// Run the mock consensus client
    Consensus(ConsensusArgs),
}

impl Command {
    pub fn service_name(&self) -> &'static str {
        match self {
            Command::Relay(_) => "relay",
            Command::Consensus(_) => "consensus",
        }
    }
}

/// Both halves of the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub relay: RelayConfig,
    pub consensus: DriverConfig,
}

impl FileConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

// =============================================================================
// RELAY
// =============================================================================

#[derive(Args, Debug, Default)]
pub struct RelayArgs {
    /// Builder API listen address
    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Engine API listen address
    #[arg(long)]
    pub engine_listen_addr: Option<SocketAddr>,

    /// Allowed CORS origin; repeatable, `*` allows any
    #[arg(long = "cors")]
    pub cors: Vec<String>,

    /// Per-request timeout, e.g. `30s`
    #[arg(long, value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    /// How get-payload finds the proposer key
    #[arg(long, value_parser = parse_session_mode)]
    pub session_mode: Option<SessionMode>,

    /// Genesis execution-config file of the engine's chain
    #[arg(long = "genesis")]
    pub genesis_path: Option<PathBuf>,

    /// Engine API JWT secret file
    #[arg(long = "jwt-secret")]
    pub jwt_secret_path: Option<PathBuf>,

    /// Engine chain snapshot directory
    #[arg(long)]
    pub datadir: Option<PathBuf>,

    /// Root of genesis validators
    #[arg(long, value_parser = parse_root)]
    pub genesis_validators_root: Option<Hash>,
}

impl RelayArgs {
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(addr) = self.engine_listen_addr {
            config.engine_listen_addr = addr;
        }
        if !self.cors.is_empty() {
            config.cors = self.cors.clone();
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout = timeout;
        }
        if let Some(mode) = self.session_mode {
            config.session_mode = mode;
        }
        if let Some(path) = &self.genesis_path {
            config.genesis_path = Some(path.clone());
        }
        if let Some(path) = &self.jwt_secret_path {
            config.jwt_secret_path = Some(path.clone());
        }
        if let Some(dir) = &self.datadir {
            config.datadir = Some(dir.clone());
        }
        if let Some(root) = self.genesis_validators_root {
            config.genesis_validators_root = root;
        }
    }
}

// =============================================================================
// CONSENSUS
// =============================================================================

#[derive(Args, Debug, Default)]
pub struct ConsensusArgs {
    /// Beacon genesis time, unix seconds
    #[arg(long = "beacon-genesis-time")]
    pub genesis_time: Option<u64>,

    /// Time per slot, e.g. `12s` or `500ms`
    #[arg(long, value_parser = parse_duration)]
    pub slot_time: Option<Duration>,

    /// Slots per epoch
    #[arg(long)]
    pub slots_per_epoch: Option<u64>,

    /// Address of the Engine JSON-RPC endpoint
    #[arg(long = "engine")]
    pub engine_addr: Option<String>,

    /// Address of a builder relay REST endpoint to propose through
    #[arg(long = "builder")]
    pub builder_addr: Option<String>,

    /// Directory for execution chain data; in-memory when unset
    #[arg(long)]
    pub datadir: Option<PathBuf>,

    /// Genesis execution-config file
    #[arg(long = "genesis")]
    pub genesis_path: Option<PathBuf>,

    /// JWT secret file for authenticated engine calls
    #[arg(long = "jwt-secret")]
    pub jwt_secret_path: Option<PathBuf>,

    /// Enode of the execution client to feed pre-merge blocks to
    #[arg(long = "node")]
    pub peer: Option<String>,

    /// Terminate after the specified number of slots
    #[arg(long)]
    pub slot_bound: Option<u64>,

    /// Root of genesis validators
    #[arg(long, value_parser = parse_root)]
    pub genesis_validators_root: Option<Hash>,

    /// Timeout of engine and builder calls
    #[arg(long, value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    /// Probability of a gap slot
    #[arg(long)]
    pub gap_freq: Option<f64>,

    /// Probability of sending a payload with an invalid block hash
    #[arg(long)]
    pub invalid_hash_freq: Option<f64>,

    /// Probability of building on an ancestor
    #[arg(long)]
    pub reorg_freq: Option<f64>,

    /// Probability of asking the engine for a proposal
    #[arg(long)]
    pub proposal_freq: Option<f64>,

    /// Deepest reorg in blocks
    #[arg(long)]
    pub reorg_max_depth: Option<u64>,

    /// Seed of the behavior RNG
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of test accounts sending sample transactions
    #[arg(long)]
    pub test_accounts: Option<u32>,
}

impl ConsensusArgs {
    pub fn apply(&self, config: &mut DriverConfig) {
        macro_rules! set {
            ($($field:ident => $target:expr),* $(,)?) => {
                $(if let Some(value) = self.$field.clone() {
                    $target = value;
                })*
            };
        }
        set! {
            genesis_time => config.genesis_time,
            slot_time => config.slot_time,
            slots_per_epoch => config.slots_per_epoch,
            engine_addr => config.engine_addr,
            slot_bound => config.slot_bound,
            genesis_validators_root => config.genesis_validators_root,
            request_timeout => config.request_timeout,
            genesis_path => config.genesis_path,
            jwt_secret_path => config.jwt_secret_path,
            gap_freq => config.behavior.gap_freq,
            invalid_hash_freq => config.behavior.invalid_hash_freq,
            reorg_freq => config.behavior.reorg_freq,
            proposal_freq => config.behavior.proposal_freq,
            reorg_max_depth => config.behavior.reorg_max_depth,
            test_accounts => config.behavior.test_accounts,
        }
        if self.builder_addr.is_some() {
            config.builder_addr = self.builder_addr.clone();
        }
        if self.datadir.is_some() {
            config.datadir = self.datadir.clone();
        }
        if self.peer.is_some() {
            config.peer = self.peer.clone();
        }
        if self.seed.is_some() {
            config.behavior.seed = self.seed;
        }
    }
}

// =============================================================================
// VALUE PARSERS
// =============================================================================

fn parse_session_mode(text: &str) -> Result<SessionMode, String> {
    match text {
        "single_outstanding" | "single-outstanding" => Ok(SessionMode::SingleOutstanding),
        "per_block_hash" | "per-block-hash" => Ok(SessionMode::PerBlockHash),
        other => Err(format!(
            "unknown session mode {other:?}, expected single_outstanding or per_block_hash"
        )),
    }
}

fn parse_root(text: &str) -> Result<Hash, String> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    let bytes = hex::decode(digits).map_err(|e| e.to_string())?;
    if bytes.len() != 32 {
        return Err(format!("expected 32 bytes, got {}", bytes.len()));
    }
    Ok(Hash::from_slice(&bytes))
}
