//! Ports of the consensus driver (hexagonal architecture)

pub mod outbound;

pub use outbound::*;
