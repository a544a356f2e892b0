//! # Inbound Ports (Driving Ports / API)
//!
//! Implementations must be thread-safe (`Send + Sync`): the relay shares one
//! signer across concurrently handled requests.

use shared_types::{BlsPublicKeyBytes, BlsSignatureBytes, HashTreeRoot};

use crate::domain::errors::SigningError;

/// A key pair bound to a signing domain.
pub trait SigningApi: Send + Sync {
    /// Public half of the held key.
    fn public_key(&self) -> BlsPublicKeyBytes;

    /// Sign `signable` under the bound domain.
    fn sign<T: HashTreeRoot + ?Sized>(&self, signable: &T) -> Result<BlsSignatureBytes, SigningError>;

    /// Verify someone else's signature under the bound domain.
    fn verify<T: HashTreeRoot + ?Sized>(
        &self,
        signable: &T,
        public_key: &[u8],
        signature: &[u8],
    ) -> Result<bool, SigningError>;
}
