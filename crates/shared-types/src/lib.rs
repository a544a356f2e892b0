//! # Shared Types Crate
//!
//! Wire-level data model shared by every MergeMock crate.
//!
//! ## Clusters
//!
//! - **Primitives**: `Hash`, `Address`, `U256`, hex byte wrappers, quantity codecs
//! - **Payloads**: engine-form and REST-form execution payloads, payload headers
//! - **Builder API**: validator registrations, builder bids, blinded beacon blocks
//! - **Engine API**: forkchoice state, payload attributes, payload status, JSON-RPC envelopes
//! - **Commitments**: hash-tree-root of every signable object, signing domains
//!
//! ## Design Principles
//!
//! - Conversions between payload renderings are explicit and return a typed
//!   [`PayloadConversionError`] on malformed input.
//! - Signable objects implement [`HashTreeRoot`]; a malformed object yields a
//!   [`CommitmentError`] rather than a silently truncated commitment.

pub mod builder;
pub mod commitment;
pub mod engine;
pub mod payload;
pub mod primitives;
pub mod signing;

pub use builder::*;
pub use commitment::{
    transactions_root, CommitmentError, HashTreeRoot, Root, BYTES_PER_LOGS_BLOOM,
    MAX_BYTES_PER_TRANSACTION, MAX_EXTRA_DATA_BYTES, MAX_TRANSACTIONS_PER_PAYLOAD,
};
pub use engine::*;
pub use payload::*;
pub use primitives::*;
pub use signing::*;
