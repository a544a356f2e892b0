//! Driver domain: slot clock, finality bookkeeping, probabilistic behavior,
//! locally fabricated blocks.

pub mod behavior;
pub mod blocks;
pub mod finality;
pub mod pending;
pub mod slot;

pub use behavior::{reorg_target, SlotBehavior};
pub use finality::{FinalityTracker, Rotation};
pub use pending::{PendingProposal, ProposalMailbox};
pub use slot::SlotClock;
