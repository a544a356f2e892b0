//! # Chain Errors

use shared_types::Hash;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChainError>;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("unknown parent block {0:?}")]
    UnknownParent(Hash),

    #[error("unknown block {0:?}")]
    UnknownBlock(Hash),

    #[error("block hash mismatch: payload declares {declared:?}, computed {computed:?}")]
    BlockHashMismatch { declared: Hash, computed: Hash },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("nonce mismatch for {sender}: expected {expected}, got {actual}")]
    NonceMismatch {
        sender: String,
        expected: u64,
        actual: u64,
    },

    #[error("invalid genesis: {0}")]
    Genesis(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
