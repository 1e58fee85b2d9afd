use std::collections::HashMap;

use xxhash_rust::xxh3::Xxh3Builder;

use crate::types::{Key, Position, Timestamp};

/// Where the latest live value for a key lives.
///
/// Refers to the log by position only; the log owns the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub position: Position,
    /// Length of the value in bytes, cached so callers need not read the log.
    pub value_size: u64,
    /// Copy of the record's timestamp.
    pub timestamp: Timestamp,
}

/// In-memory map from key to the location of its latest live value.
///
/// The index does no ordering checks of its own: whoever calls `set` must
/// only do so right after appending the newest record for that key. It never
/// touches the log.
pub struct KeyIndex {
    entries: HashMap<Key, IndexEntry, Xxh3Builder>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        KeyIndex {
            entries: HashMap::with_capacity_and_hasher(capacity, Xxh3Builder::new()),
        }
    }

    /// Point `key` at `entry`, replacing whatever was there.
    pub fn set(&mut self, key: Key, entry: IndexEntry) {
        self.entries.insert(key, entry);
    }

    /// Forget `key`. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &str) -> Option<IndexEntry> {
        self.entries.remove(key)
    }

    pub fn lookup(&self, key: &str) -> Option<IndexEntry> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Live entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> + '_ {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }
}

impl Default for KeyIndex {
    fn default() -> Self {
        Self::new()
    }
}
