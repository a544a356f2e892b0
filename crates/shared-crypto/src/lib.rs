//! # Shared Crypto
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `bls` | BLS12-381 (min-pk) | Builder bids, registrations, blinded blocks |
//! | `hashing` | Keccak-256 | Block hashes, transaction hashes, addresses |
//! | `ecdsa` | secp256k1 | Sample transaction signing and sender recovery |
//! | `accounts` | secp256k1 | Deterministic funded test accounts |
//! | `jwt` | HS256 key material, `iat` tokens | Engine API authentication |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accounts;
pub mod bls;
pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod jwt;

// Re-exports
pub use accounts::TestAccount;
pub use bls::{BlsKeyPair, BlsPublicKey, BlsSignature};
pub use ecdsa::{recover_address, RecoverableSignature, Secp256k1KeyPair};
pub use errors::CryptoError;
pub use hashing::{keccak256, keccak256_concat};
pub use jwt::JwtSecret;
