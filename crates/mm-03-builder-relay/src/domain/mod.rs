//! Relay domain: payload cache, proposer sessions, configuration, errors.

pub mod cache;
pub mod config;
pub mod error;
pub mod sessions;

pub use cache::PayloadCache;
pub use config::{ConfigError, RelayConfig};
pub use error::{RelayError, Result};
pub use sessions::{ProposerSessions, SessionMode};
