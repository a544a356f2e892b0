//! Domain layer: pure signing logic.

pub mod errors;
pub mod verify;
