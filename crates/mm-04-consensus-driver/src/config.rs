//! Driver configuration with validation.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use shared_types::Hash;

/// Shortest slot the driver accepts.
pub const MIN_SLOT_TIME: Duration = Duration::from_millis(50);

/// Timeout of every engine and builder call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Consensus driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Beacon genesis time, unix seconds
    pub genesis_time: u64,
    /// Duration of one slot
    #[serde(with = "humantime_serde")]
    pub slot_time: Duration,
    /// Slots per epoch; finality rotates on epoch boundaries
    pub slots_per_epoch: u64,
    /// Stop successfully after this slot; 0 runs forever
    pub slot_bound: u64,
    /// Validators root mixed into the beacon-proposer domain
    pub genesis_validators_root: Hash,
    /// Engine JSON-RPC endpoint
    pub engine_addr: String,
    /// Builder relay REST endpoint; proposals go through the engine when unset
    pub builder_addr: Option<String>,
    /// Engine API shared secret file
    pub jwt_secret_path: PathBuf,
    /// Execution genesis file
    pub genesis_path: PathBuf,
    /// Chain snapshot directory; in-memory only when unset
    pub datadir: Option<PathBuf>,
    /// Legacy peer (`enode://<id>@host:port`) fed by the proof-of-work prologue
    pub peer: Option<String>,
    /// Timeout of engine and builder calls
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Probabilistic behavior
    pub behavior: ConsensusBehavior,
}

impl Default for DriverConfig {
    fn default() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            genesis_time: now + 5,
            slot_time: Duration::from_secs(12),
            slots_per_epoch: 32,
            slot_bound: 0,
            genesis_validators_root: Hash::zero(),
            engine_addr: "http://127.0.0.1:8551".to_string(),
            builder_addr: None,
            jwt_secret_path: PathBuf::from("jwt.hex"),
            genesis_path: PathBuf::from("genesis.json"),
            datadir: None,
            peer: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            behavior: ConsensusBehavior::default(),
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_time < MIN_SLOT_TIME {
            return Err(ConfigError::SlotTimeTooSmall(self.slot_time));
        }
        if self.slots_per_epoch == 0 {
            return Err(ConfigError::InvalidLimit(
                "slots_per_epoch cannot be 0".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidLimit(
                "request_timeout cannot be 0".into(),
            ));
        }
        if self.engine_addr.is_empty() {
            return Err(ConfigError::InvalidAddress("engine_addr is empty".into()));
        }
        self.behavior.validate()
    }

    /// Whether failures should end the run.
    pub fn is_bounded(&self) -> bool {
        self.slot_bound > 0
    }
}

/// Frequencies and limits of the probabilistic slot behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusBehavior {
    /// Chance a slot produces no block
    pub gap_freq: f64,
    /// Chance a slot sends a payload with a wrong block hash
    pub invalid_hash_freq: f64,
    /// Chance a slot builds on an ancestor instead of the head
    pub reorg_freq: f64,
    /// Chance a forkchoice update asks the engine to build the next block
    pub proposal_freq: f64,
    /// Deepest reorg, in blocks
    pub reorg_max_depth: u64,
    /// RNG seed; random when unset
    pub seed: Option<u64>,
    /// Number of funded test accounts
    pub test_accounts: u32,
}

impl Default for ConsensusBehavior {
    fn default() -> Self {
        Self {
            gap_freq: 0.05,
            invalid_hash_freq: 0.05,
            reorg_freq: 0.05,
            proposal_freq: 0.5,
            reorg_max_depth: 16,
            seed: None,
            test_accounts: 10,
        }
    }
}

impl ConsensusBehavior {
    /// Never skips, corrupts or reorgs; proposes every other slot on average.
    pub fn steady() -> Self {
        Self {
            gap_freq: 0.0,
            invalid_hash_freq: 0.0,
            reorg_freq: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("gap_freq", self.gap_freq),
            ("invalid_hash_freq", self.invalid_hash_freq),
            ("reorg_freq", self.reorg_freq),
            ("proposal_freq", self.proposal_freq),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidFrequency { name, value });
            }
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("slot time {0:?} is too small")]
    SlotTimeTooSmall(Duration),
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidFrequency { name: &'static str, value: f64 },
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
