//! # Signing Errors

use shared_types::CommitmentError;
use thiserror::Error;

/// Errors that can occur while signing or verifying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    /// The signable object has no canonical commitment
    #[error("cannot compute commitment: {0}")]
    Commitment(#[from] CommitmentError),

    /// The signature bytes are malformed or the wrong length
    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,

    /// The public key bytes are malformed or the wrong length
    #[error("invalid public key encoding")]
    InvalidPublicKeyEncoding,
}
