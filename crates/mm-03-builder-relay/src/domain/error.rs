//! Relay error types.
//!
//! Every variant maps to a plain-text HTTP status in `api`; there is no
//! structured error envelope.

use mm_01_signing::SigningError;
use shared_types::PayloadConversionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid pubkey")]
    InvalidPubkey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("{0}")]
    Decode(String),

    #[error("cannot get unknown payload")]
    UnknownPayload,

    #[error("cannot convert payload: {0}")]
    Conversion(#[from] PayloadConversionError),

    #[error("cannot sign bid: {0}")]
    Signing(#[from] SigningError),

    #[error("cannot encode response: {0}")]
    Encode(String),
}

impl RelayError {
    /// Whether the error is the caller's fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Encode(_))
    }
}
