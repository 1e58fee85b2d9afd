//! The store: an [`AppendLog`] and a [`KeyIndex`] kept in lockstep.
//!
//! Every mutation appends first and updates the keydir second, under one
//! write lock, so a reader can never see a keydir entry that points past the
//! end of the log.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::keydir::{IndexEntry, KeyIndex};
use crate::log::AppendLog;
use crate::types::{Key, Position, Timestamp, Value};
use crate::wal::{LogSink, Record, SyncPolicy, WalReader, WalWriter};

/// Tuning knobs for a store.
#[derive(Debug, Clone)]
pub struct Options {
    /// When the log file is fsync'd. Ignored by memory-only stores.
    pub sync_policy: SyncPolicy,
    /// Initial keydir capacity.
    pub index_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            sync_policy: SyncPolicy::EveryWrite,
            index_capacity: 1024,
        }
    }
}

impl Options {
    pub fn with_sync_policy(mut self, sync_policy: SyncPolicy) -> Self {
        self.sync_policy = sync_policy;
        self
    }

    pub fn with_index_capacity(mut self, index_capacity: usize) -> Self {
        self.index_capacity = index_capacity;
        self
    }
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    /// Records in the log, tombstones included.
    pub log_len: u64,
    /// Keys currently readable.
    pub live_keys: usize,
    /// Tombstone records in the log.
    pub tombstones: u64,
    /// Sum of the value sizes of all live keys.
    pub live_bytes: u64,
    /// Records no live key points at: superseded writes plus tombstones.
    pub dead_records: u64,
}

struct State {
    log: AppendLog,
    index: KeyIndex,
    last_timestamp: Timestamp,
}

impl State {
    fn new(log: AppendLog, index_capacity: usize) -> Self {
        State {
            log,
            index: KeyIndex::with_capacity(index_capacity),
            last_timestamp: Timestamp::default(),
        }
    }

    /// Wall-clock now, never earlier than the last record's timestamp.
    fn next_timestamp(&mut self) -> Timestamp {
        let ts = Timestamp::now().max(self.last_timestamp);
        self.last_timestamp = ts;
        ts
    }

    /// Append `record` and bring the keydir in line with it.
    fn apply(&mut self, record: Record) -> Result<Position> {
        let key = record.key.clone();
        let tombstone = record.is_tombstone();
        let entry = IndexEntry {
            position: Position::new(0),
            value_size: record.value.len() as u64,
            timestamp: record.timestamp,
        };
        self.last_timestamp = self.last_timestamp.max(record.timestamp);

        let position = self.log.append(record)?;
        if tombstone {
            self.index.remove(&key);
        } else {
            self.index.set(key, IndexEntry { position, ..entry });
        }
        Ok(position)
    }
}

/// A log-structured key-value store.
///
/// `Store` is `Send + Sync`; share it with `Arc<Store>`. Writers are
/// serialized; readers run in parallel with each other.
pub struct Store {
    state: RwLock<State>,
    path: Option<PathBuf>,
}

impl Store {
    /// Create an empty memory-only store.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Create an empty memory-only store with the given options.
    pub fn with_options(options: Options) -> Self {
        Store {
            state: RwLock::new(State::new(AppendLog::new(), options.index_capacity)),
            path: None,
        }
    }

    /// Create an empty store that mirrors every write to `sink`.
    ///
    /// The sink is treated as empty: nothing is replayed from it, and the
    /// first record sent to it is at position 0. Use [`Store::open`] to
    /// resume an existing log file.
    pub fn with_sink(sink: Box<dyn LogSink>, options: Options) -> Self {
        Store {
            state: RwLock::new(State::new(AppendLog::with_sink(sink), options.index_capacity)),
            path: None,
        }
    }

    /// Open a file-backed store, rebuilding the keydir by replaying the log.
    ///
    /// Replay stops at the first record that fails to decode; the file is cut
    /// back to the last good record before new writes go after it.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let path = path.as_ref();
        let reader = WalReader::open(path)?;
        let mut state = State::new(AppendLog::new(), options.index_capacity);

        let mut records = reader.iter();
        for record in records.by_ref() {
            state.apply(record)?;
        }
        let valid_len = records.offset();
        if records.hit_corruption() {
            warn!(
                valid_len,
                discarded = reader.len() - valid_len,
                "log ends in a torn record, discarding tail"
            );
        }

        let writer = WalWriter::resume(path, valid_len, options.sync_policy)?;
        state.log.attach_sink(Box::new(writer));

        info!(
            records = state.log.len(),
            live_keys = state.index.len(),
            "store opened"
        );

        Ok(Store {
            state: RwLock::new(state),
            path: Some(path.to_path_buf()),
        })
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write `value` under `key`. The next `get(key)` returns it.
    pub fn put(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key: Key = key.into();
        let value: Value = value.into();
        let value_size = value.len();

        let mut state = self.state.write();
        let timestamp = state.next_timestamp();
        let position = state.apply(Record::put(key.clone(), value, timestamp))?;
        debug!(key = %key, %position, value_size, "put");
        Ok(())
    }

    /// Latest value for `key`, or `None` if it was never written or was deleted.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let state = self.state.read();
        let Some(entry) = state.index.lookup(key) else {
            return Ok(None);
        };

        match state.log.read_at(entry.position) {
            Ok(record) if record.key == key && !record.is_tombstone() => {
                Ok(Some(record.value.clone()))
            }
            other => {
                error!(
                    key,
                    position = %entry.position,
                    cause = ?other.err(),
                    "keydir entry does not resolve to a live record"
                );
                Err(Error::Desync {
                    key: key.to_owned(),
                    position: entry.position,
                })
            }
        }
    }

    /// Delete `key`. A tombstone is logged even if the key is absent.
    pub fn delete(&self, key: impl Into<Key>) -> Result<()> {
        let key: Key = key.into();

        let mut state = self.state.write();
        let timestamp = state.next_timestamp();
        let position = state.apply(Record::tombstone(key.clone(), timestamp))?;
        debug!(key = %key, %position, "delete");
        Ok(())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.state.read().index.contains(key)
    }

    /// The keydir entry for `key`, without touching the log.
    pub fn lookup(&self, key: &str) -> Option<IndexEntry> {
        self.state.read().index.lookup(key)
    }

    /// Live keys in no particular order.
    pub fn keys(&self) -> Vec<Key> {
        self.state.read().index.keys().map(str::to_owned).collect()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().index.is_empty()
    }

    /// Number of records in the log.
    pub fn log_len(&self) -> u64 {
        self.state.read().log.len()
    }

    /// Copy of the record at `position`.
    pub fn record_at(&self, position: Position) -> Result<Record> {
        self.state.read().log.read_at(position).cloned()
    }

    /// Every record ever written for `key`, oldest first, tombstones included.
    pub fn history(&self, key: &str) -> Vec<(Position, Record)> {
        self.state
            .read()
            .log
            .iter()
            .filter(|(_, r)| r.key == key)
            .map(|(p, r)| (p, r.clone()))
            .collect()
    }

    pub fn stats(&self) -> Stats {
        let state = self.state.read();
        let log_len = state.log.len();
        let live_keys = state.index.len();
        let tombstones = state.log.iter().filter(|(_, r)| r.is_tombstone()).count() as u64;
        let live_bytes = state.index.iter().map(|(_, e)| e.value_size).sum();

        Stats {
            log_len,
            live_keys,
            tombstones,
            live_bytes,
            dead_records: log_len - live_keys as u64,
        }
    }

    /// Force the log onto stable storage. No-op for memory-only stores.
    pub fn sync(&self) -> Result<()> {
        self.state.write().log.sync()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_never_go_backwards() {
        let store = Store::new();
        store.state.write().last_timestamp = Timestamp::from_millis(u64::MAX - 1);

        store.put("a", b"1".to_vec()).unwrap();
        store.put("a", b"2".to_vec()).unwrap();

        let history = store.history("a");
        assert_eq!(history[0].1.timestamp, Timestamp::from_millis(u64::MAX - 1));
        assert!(history[1].1.timestamp >= history[0].1.timestamp);
    }

    #[test]
    fn dangling_index_entry_is_reported_as_desync() {
        let store = Store::new();
        store.put("a", b"1".to_vec()).unwrap();
        store.state.write().index.set(
            "a".to_string(),
            IndexEntry {
                position: Position::new(42),
                value_size: 1,
                timestamp: Timestamp::default(),
            },
        );

        assert!(matches!(store.get("a"), Err(Error::Desync { .. })));
    }

    #[test]
    fn index_entry_on_tombstone_is_reported_as_desync() {
        let store = Store::new();
        store.put("a", b"1".to_vec()).unwrap();
        store.delete("a").unwrap();
        store.state.write().index.set(
            "a".to_string(),
            IndexEntry {
                position: Position::new(1),
                value_size: 0,
                timestamp: Timestamp::default(),
            },
        );

        assert!(matches!(store.get("a"), Err(Error::Desync { .. })));
    }
}
