//! # Proposer Sessions
//!
//! Which proposer key a get-payload signature is checked against.
//!
//! `SingleOutstanding` keeps only the key of the most recent get-header, so
//! two overlapping proposals overwrite each other: one outstanding proposal at
//! a time. `PerBlockHash` keys the proposer by the bid's block hash instead,
//! bounded like the payload cache.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::{BlsPublicKeyBytes, Hash};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    SingleOutstanding,
    PerBlockHash,
}

enum Sessions {
    Single(Option<BlsPublicKeyBytes>),
    PerBlock(LruCache<Hash, BlsPublicKeyBytes>),
}

pub struct ProposerSessions {
    inner: Mutex<Sessions>,
}

impl ProposerSessions {
    pub fn new(mode: SessionMode, capacity: usize) -> Self {
        let sessions = match mode {
            SessionMode::SingleOutstanding => Sessions::Single(None),
            SessionMode::PerBlockHash => Sessions::PerBlock(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        };
        Self {
            inner: Mutex::new(sessions),
        }
    }

    pub fn mode(&self) -> SessionMode {
        match &*self.inner.lock() {
            Sessions::Single(_) => SessionMode::SingleOutstanding,
            Sessions::PerBlock(_) => SessionMode::PerBlockHash,
        }
    }

    /// Remember `pubkey` as the proposer of the bid for `block_hash`.
    pub fn record(&self, block_hash: Hash, pubkey: BlsPublicKeyBytes) {
        match &mut *self.inner.lock() {
            Sessions::Single(latest) => *latest = Some(pubkey),
            Sessions::PerBlock(by_hash) => {
                by_hash.put(block_hash, pubkey);
            }
        }
    }

    /// Proposer key to verify a blinded block for `block_hash` against.
    pub fn proposer_for(&self, block_hash: &Hash) -> Option<BlsPublicKeyBytes> {
        match &mut *self.inner.lock() {
            Sessions::Single(latest) => *latest,
            Sessions::PerBlock(by_hash) => by_hash.get(block_hash).copied(),
        }
    }
}
