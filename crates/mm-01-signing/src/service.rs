//! # Signing Service
//!
//! Implements `SigningApi` for a BLS key pair and one signing domain.

use shared_crypto::BlsKeyPair;
use shared_types::{BlsPublicKeyBytes, BlsSignatureBytes, Domain, HashTreeRoot};
use tracing::trace;

use crate::domain::errors::SigningError;
use crate::domain::verify;
use crate::ports::inbound::SigningApi;

pub struct SigningService {
    keypair: BlsKeyPair,
    public_key: BlsPublicKeyBytes,
    domain: Domain,
}

impl SigningService {
    pub fn new(keypair: BlsKeyPair, domain: Domain) -> Self {
        let public_key = BlsPublicKeyBytes(keypair.public_key().to_bytes());
        Self {
            keypair,
            public_key,
            domain,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }
}

impl SigningApi for SigningService {
    fn public_key(&self) -> BlsPublicKeyBytes {
        self.public_key
    }

    fn sign<T: HashTreeRoot + ?Sized>(&self, signable: &T) -> Result<BlsSignatureBytes, SigningError> {
        verify::sign(&self.keypair, signable, self.domain)
    }

    fn verify<T: HashTreeRoot + ?Sized>(
        &self,
        signable: &T,
        public_key: &[u8],
        signature: &[u8],
    ) -> Result<bool, SigningError> {
        let verified = verify::verify_signature(signable, self.domain, public_key, signature)?;
        trace!(pubkey = %hex_prefix(public_key), verified, "Signature checked");
        Ok(verified)
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(8)])
}
