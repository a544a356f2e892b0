//! HTTP surface of the relay.

pub mod cors;
pub mod router;
pub mod tracing;

pub use router::build_router;
