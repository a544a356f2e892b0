//! Finalized / safe / next-finalized bookkeeping.
//!
//! On every epoch boundary: `finalized <- next_finalized`,
//! `safe <- finalized`, `next_finalized <- head`. A head therefore becomes
//! safe and finalized two boundaries after it was observed.

use shared_types::{ForkchoiceStateV1, Hash};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalityTracker {
    finalized: Hash,
    safe: Hash,
    next_finalized: Hash,
}

/// What an epoch rotation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    pub previous: Hash,
    pub finalized: Hash,
    pub next: Hash,
}

impl FinalityTracker {
    pub fn finalized(&self) -> Hash {
        self.finalized
    }

    pub fn safe(&self) -> Hash {
        self.safe
    }

    pub fn next_finalized(&self) -> Hash {
        self.next_finalized
    }

    /// Slot 0: the genesis head becomes safe.
    pub fn on_genesis(&mut self, head: Hash) {
        self.safe = head;
    }

    pub fn rotate(&mut self, head: Hash) -> Rotation {
        let previous = self.finalized;
        self.finalized = self.next_finalized;
        self.safe = self.finalized;
        self.next_finalized = head;
        Rotation {
            previous,
            finalized: self.finalized,
            next: self.next_finalized,
        }
    }

    /// Forkchoice state naming `head`.
    pub fn forkchoice(&self, head: Hash) -> ForkchoiceStateV1 {
        ForkchoiceStateV1 {
            head_block_hash: head,
            safe_block_hash: self.safe,
            finalized_block_hash: self.finalized,
        }
    }
}
