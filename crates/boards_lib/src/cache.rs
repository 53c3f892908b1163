//! The shared leaderboard cache.
//!
//! Collating boards is the expensive path (it walks every snapshot of every
//! selected game), so computed raw boards are kept next to the option set that
//! produced them. Whether a new request can be served from an entry is the
//! call of [`OptionSet::needs_db`]; the cache itself only stores and swaps.
//!
//! Entries are handed out as [`Arc`]s and replaced by a single atomic swap
//! under the lock, so a reader never observes an entry mid-update and
//! concurrent recomputations race safely (last writer wins).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::board::GameBoards;
use crate::options::OptionSet;

/// A computed result paired with the option set it was computed with.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The options the boards were collated under.
    pub options: OptionSet,
    /// The raw (pre player-filter) boards.
    pub boards: Vec<GameBoards>,
}

/// The process-wide board cache, keyed by client key.
#[derive(Debug, Default)]
pub struct BoardCache {
    entries: RwLock<HashMap<String, Arc<CacheEntry>>>,
}

impl BoardCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned(),
            // A poisoned lock only means a writer panicked mid-insert; the map
            // itself is never left partially updated.
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    /// Stores `entry` under `key`, replacing any previous entry in one swap.
    pub fn put(&self, key: String, entry: CacheEntry) {
        let entry = Arc::new(entry);
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key, entry);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key, entry);
            }
        }
    }

    /// Drops the entry stored under `key`.
    pub fn evict(&self, key: &str) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.remove(key);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(key);
            }
        }
    }
}
