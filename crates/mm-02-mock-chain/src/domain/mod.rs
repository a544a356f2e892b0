//! Pure chain logic: blocks, transactions, state and fee rules.

pub mod block;
pub mod fee;
pub mod genesis;
pub mod state;
pub mod transaction;
