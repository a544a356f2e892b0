//! Single-slot handoff of payload ids from the forkchoice step to the next
//! slot tick.

use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::PayloadId;

/// A payload the engine is building for `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingProposal {
    pub payload_id: PayloadId,
    pub slot: u64,
}

/// Holds at most one pending proposal; a newer post replaces an older one.
#[derive(Debug, Clone, Default)]
pub struct ProposalMailbox {
    slot: Arc<Mutex<Option<PendingProposal>>>,
}

impl ProposalMailbox {
    /// Store `proposal`, returning the one it displaced.
    pub fn post(&self, proposal: PendingProposal) -> Option<PendingProposal> {
        self.slot.lock().replace(proposal)
    }

    /// Non-blocking receive.
    pub fn take(&self) -> Option<PendingProposal> {
        self.slot.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(slot: u64) -> PendingProposal {
        PendingProposal {
            payload_id: PayloadId([slot as u8; 8]),
            slot,
        }
    }

    #[test]
    fn test_newest_post_wins() {
        let mailbox = ProposalMailbox::default();
        assert!(mailbox.take().is_none());

        assert_eq!(mailbox.post(proposal(3)), None);
        let sender = mailbox.clone();
        assert_eq!(sender.post(proposal(4)), Some(proposal(3)));

        assert_eq!(mailbox.take(), Some(proposal(4)));
        assert!(mailbox.is_empty());
    }
}
