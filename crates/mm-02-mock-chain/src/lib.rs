//! # Mock Chain (mm-02)
//!
//! The execution-side chain both the consensus driver and the co-hosted mock
//! engine build on. It is deliberately small: accounts only carry nonces,
//! roots are keccak commitments rather than tries, and there is no
//! proof-of-work sealing.
//!
//! ## Operations
//!
//! | Operation | Method |
//! |-----------|--------|
//! | mine on parent | [`MockChain::mine_block`] |
//! | process external payload | [`MockChain::process_payload`] |
//! | head / total difficulty | [`MockChain::current_header`], [`MockChain::current_td`] |
//! | header lookup | [`MockChain::header_by_hash`], [`MockChain::header_by_number`] |
//! | close | [`MockChain::close`] |
//!
//! ## Crate Structure
//!
//! - `domain/` - blocks, transactions, account state, fee rule, genesis
//! - `chain.rs` - block tree, canonical index, import and execution
//! - `snapshot.rs` - JSON persistence in the data directory

pub mod chain;
pub mod domain;
pub mod error;
pub mod snapshot;

pub use chain::{BlockTemplate, MockChain};
pub use domain::block::{Block, Header};
pub use domain::fee::next_base_fee;
pub use domain::genesis::{GenesisSpec, DEFAULT_CHAIN_ID, INITIAL_BASE_FEE};
pub use domain::state::AccountNonces;
pub use domain::transaction::{DynamicFeeTransaction, SignedTransaction, TRANSFER_GAS};
pub use error::{ChainError, Result};
