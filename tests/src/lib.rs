//! # MergeMock Test Suite
//!
//! Cross-crate flows that run the relay and the consensus driver in one
//! process and talk to them over real HTTP on ephemeral ports.
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs      # Relay harness
//!     ├── relay_flow.rs   # Builder API and engine API against one server
//!     └── driver_flow.rs  # Consensus driver slots against the relay's engine
//! ```
//!
//! ```bash
//! cargo test -p mm-tests
//! ```

pub mod integration;
