//! # Signing / Verification (MM-01)
//!
//! Wraps the hash-tree-root commitment and BLS12-381 signatures into one
//! primitive shared by the builder relay and the consensus driver.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): pure sign/verify over signing roots, no I/O
//! - **Ports Layer** (`ports/`): the `SigningApi` consumed by other crates
//! - **Service Layer** (`service.rs`): a key pair bound to a signing domain
//!
//! ## Verification Contract
//!
//! `verify(signable, public_key, signature)` recomputes the commitment, then
//! decodes the signature, then the public key. Any failure short-circuits to
//! an error; callers treat both `Ok(false)` and `Err(_)` as "reject".

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::errors::SigningError;
pub use domain::verify::{sign, verify_signature};
pub use ports::inbound::SigningApi;
pub use service::SigningService;
