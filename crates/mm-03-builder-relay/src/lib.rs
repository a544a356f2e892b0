//! # Builder Relay (mm-03)
//!
//! Mock builder relay with a co-hosted execution engine.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RELAY PROCESS                          │
//! │                                                             │
//! │  builder REST (:28545)            engine JSON-RPC (:8551)   │
//! │  CORS → Tracing → Timeout         JWT                       │
//! │        │                                 │                  │
//! │  ┌─────┴──────┐                   ┌──────┴──────┐           │
//! │  │RelayService│                   │ MockEngine  │           │
//! │  └─────┬──────┘                   └──────┬──────┘           │
//! │        │       ┌───────────────┐         │                  │
//! │        └──────►│ PayloadCache  │◄────────┘                  │
//! │                │ (LRU, 10)     │  engine form, by parent    │
//! │                └───────────────┘  REST form, by block hash  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A forkchoice update with attributes makes the engine publish a payload
//! under its parent hash. Get-header turns it into a signed bid and re-caches
//! the REST form under the payload's own hash, which get-payload then reveals
//! to a correctly signed blinded block.
//!
//! ## Known limitation
//!
//! With the default [`SessionMode::SingleOutstanding`] only the most recent
//! get-header caller can retrieve a payload; use
//! [`SessionMode::PerBlockHash`] for overlapping proposals.

pub mod api;
pub mod domain;
pub mod engine;
pub mod server;
pub mod service;

pub use domain::{
    ConfigError, PayloadCache, ProposerSessions, RelayConfig, RelayError, Result, SessionMode,
};
pub use engine::{EngineError, JwtVerifier, MockEngine};
pub use server::{RelayServer, ServerError};
pub use service::RelayService;
