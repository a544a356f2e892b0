//! Error types for the consensus driver

use mm_01_signing::SigningError;
use mm_02_mock_chain::ChainError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors that can occur while driving slots
#[derive(Debug, Error)]
pub enum DriverError {
    /// Startup failed: configuration, secret, genesis or peer
    #[error("setup failed: {0}")]
    Setup(String),

    /// Malformed or unexpected response
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The engine disagreed with a block it was expected to accept
    #[error("consistency failure: {0}")]
    Consistency(String),

    /// Engine, builder or peer transport failure
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Local chain rejected an operation
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Blinded block could not be signed
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Transport-level failures talking to the engine, the builder or a peer
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(String),

    #[error("request timed out")]
    Timeout,

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cannot decode response: {0}")]
    Decode(String),

    #[error("peer error: {0}")]
    Peer(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}
