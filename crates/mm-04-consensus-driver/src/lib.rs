//! # Consensus Driver (mm-04)
//!
//! Mock consensus client: ticks once per slot and drives an execution engine
//! through external blocks, gap slots, invalid payloads, reorgs and
//! proposals.
//!
//! ```text
//!   slot tick ──► ConsensusDriver ──► JoinSet of background steps
//!                   │      ▲               │
//!                   │      └─ ProposalMailbox ◄── payload id (next slot)
//!                   ▼                      ▼
//!              SharedChain           EngineApi / BuilderApi
//!              (MockChain)     (HttpEngineClient / HttpBuilderClient)
//! ```
//!
//! ## Probabilistic behavior
//!
//! | Knob                | Effect per slot                              |
//! |---------------------|----------------------------------------------|
//! | `gap_freq`          | produce nothing                              |
//! | `invalid_hash_freq` | send a payload with a wrong block hash       |
//! | `reorg_freq`        | build on an ancestor above finality          |
//! | `proposal_freq`     | ask the engine to build the next slot's block|
//!
//! All draws come from one RNG, seeded from `behavior.seed` when set.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod prologue;
pub mod service;

pub use config::{ConfigError, ConsensusBehavior, DriverConfig, MIN_SLOT_TIME};
pub use error::{ClientError, DriverError, Result};
pub use ports::{BuilderApi, ChainBackend, EngineApi, LegacyPeer, SharedChain};
pub use service::{ConsensusDriver, RunOutcome, SlotAction};
