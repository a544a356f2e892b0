//! # Mock Telemetry
//!
//! Structured logging for the MergeMock binaries. Every crate logs through
//! `tracing` macros with structured fields; this crate installs the global
//! subscriber once at process start.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mock_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::for_service("relay"))?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MM_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `MM_JSON_LOGS` | `false` | JSON output instead of human-readable lines |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter directive: {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Install the process-wide subscriber described by `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_setup::init_tracing(config)
}
