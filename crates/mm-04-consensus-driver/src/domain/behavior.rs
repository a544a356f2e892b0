//! # Probabilistic Slot Behavior
//!
//! Every random decision of the driver draws from one injected RNG, in a
//! fixed order per slot, so a seeded run is replayable.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use shared_types::Hash;

use crate::config::ConsensusBehavior;

pub struct SlotBehavior {
    config: ConsensusBehavior,
    rng: StdRng,
}

impl SlotBehavior {
    pub fn new(config: ConsensusBehavior) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &ConsensusBehavior {
        &self.config
    }

    fn roll(&mut self, freq: f64) -> bool {
        self.rng.gen::<f64>() < freq
    }

    pub fn gap(&mut self) -> bool {
        self.roll(self.config.gap_freq)
    }

    pub fn invalid_hash(&mut self) -> bool {
        self.roll(self.config.invalid_hash_freq)
    }

    pub fn reorg(&mut self) -> bool {
        self.roll(self.config.reorg_freq)
    }

    pub fn propose(&mut self) -> bool {
        self.roll(self.config.proposal_freq)
    }

    /// Uniform in `[0, reorg_max_depth]`, both ends included.
    pub fn reorg_depth(&mut self) -> u64 {
        self.rng.gen_range(0..=self.config.reorg_max_depth)
    }

    pub fn random_hash(&mut self) -> Hash {
        let mut bytes = [0u8; 32];
        self.rng.fill_bytes(&mut bytes);
        Hash::from(bytes)
    }
}

/// Block number to build on when reorging `depth` blocks below `head`,
/// never below `floor`.
pub fn reorg_target(head: u64, depth: u64, floor: u64) -> u64 {
    head.saturating_sub(depth).max(floor)
}
