//! # Payload Cache
//!
//! Bounded LRU map from block hash to a cached payload. The co-hosted engine
//! writes engine-form payloads under their parent hash; get-header writes the
//! REST form under the payload's own hash; get-payload reads by that hash.
//!
//! Locking is internal, so one `Arc<PayloadCache>` is shared by every request.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use shared_types::{CachedPayload, Hash};

pub const DEFAULT_CAPACITY: usize = 10;

pub struct PayloadCache {
    entries: Mutex<LruCache<Hash, CachedPayload>>,
}

impl PayloadCache {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn put(&self, key: Hash, payload: CachedPayload) {
        self.entries.lock().put(key, payload);
    }

    /// Marks the entry as most recently used.
    pub fn get(&self, key: &Hash) -> Option<CachedPayload> {
        self.entries.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

impl Default for PayloadCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
