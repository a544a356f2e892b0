//! Relay configuration with validation.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::{ForkVersion, Hash, BELLATRIX_FORK_VERSION};

use super::sessions::SessionMode;

/// Relay process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Builder REST API bind address
    pub listen_addr: SocketAddr,
    /// Co-hosted engine JSON-RPC bind address
    pub engine_listen_addr: SocketAddr,
    /// Allowed CORS origins; `*` allows any
    pub cors: Vec<String>,
    /// Per-request timeout of both servers
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Payload cache capacity
    pub cache_capacity: usize,
    /// How get-payload finds the proposer key to verify against
    pub session_mode: SessionMode,
    /// Validators root mixed into the beacon-proposer domain
    pub genesis_validators_root: Hash,
    /// Fork version of the beacon-proposer domain
    pub proposer_fork_version: ForkVersion,
    /// Genesis of the co-hosted engine's chain; built-in default when unset
    pub genesis_path: Option<PathBuf>,
    /// Engine API secret; a random one is generated when unset
    pub jwt_secret_path: Option<PathBuf>,
    /// Snapshot directory of the engine's chain; in-memory only when unset
    pub datadir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 28545)),
            engine_listen_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8551)),
            cors: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            cache_capacity: 10,
            session_mode: SessionMode::SingleOutstanding,
            genesis_validators_root: Hash::zero(),
            proposer_fork_version: BELLATRIX_FORK_VERSION,
            genesis_path: None,
            jwt_secret_path: None,
            datadir: None,
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "cache_capacity cannot be 0".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout cannot be 0".into(),
            ));
        }
        if self.listen_addr.port() != 0 && self.listen_addr == self.engine_listen_addr {
            return Err(ConfigError::DuplicateAddress(self.listen_addr));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("relay and engine cannot both listen on {0}")]
    DuplicateAddress(SocketAddr),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:28545");
        assert_eq!(config.cache_capacity, 10);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = RelayConfig {
            cache_capacity: 0,
            ..RelayConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimit(_))));
    }

    #[test]
    fn test_shared_address_rejected() {
        let config = RelayConfig {
            engine_listen_addr: RelayConfig::default().listen_addr,
            ..RelayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateAddress(_))
        ));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            listen_addr = "0.0.0.0:18550"
            request_timeout = "5s"
            session_mode = "per_block_hash"
            "#,
        )
        .unwrap();
        assert_eq!(config.listen_addr.port(), 18550);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.session_mode, SessionMode::PerBlockHash);
        assert_eq!(config.cache_capacity, 10);
    }
}
