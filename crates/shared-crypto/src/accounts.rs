//! # Test Accounts
//!
//! A fixed, reproducible set of secp256k1 accounts used to synthesize sample
//! transactions. Account `i` always has the same key across runs.

use crate::ecdsa::{Address, Secp256k1KeyPair};
use crate::hashing::keccak256;
use crate::CryptoError;

/// A key/address pair able to sign transactions.
pub struct TestAccount {
    keypair: Secp256k1KeyPair,
    address: Address,
}

impl TestAccount {
    /// Derive account number `index`.
    pub fn derive(index: u32) -> Result<Self, CryptoError> {
        let secret = keccak256(format!("mergemock test account {index}").as_bytes());
        let keypair = Secp256k1KeyPair::from_bytes(secret)?;
        let address = keypair.address();
        Ok(Self { keypair, address })
    }

    /// Derive accounts `0..count`.
    pub fn derive_many(count: u32) -> Result<Vec<Self>, CryptoError> {
        (0..count).map(Self::derive).collect()
    }

    /// Account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signing key.
    pub fn keypair(&self) -> &Secp256k1KeyPair {
        &self.keypair
    }
}

impl std::fmt::Debug for TestAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestAccount")
            .field("address", &hex::encode(self.address))
            .finish_non_exhaustive()
    }
}
