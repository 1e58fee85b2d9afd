//! # Keydir Store
//!
//! A log-structured key-value store in the Bitcask style.
//!
//! ## Core idea
//! Every write is an append to a log; nothing is ever updated in place.
//! An in-memory index (the "keydir") maps each live key to the position of
//! its latest record, so a read is one hash lookup plus one positional read.
//! Deletes append a tombstone and drop the key from the keydir.

pub mod error;
pub mod keydir;
pub mod log;
pub mod store;
pub mod types;
pub mod wal;

// Public re-exports for the top-level API
pub use error::{Error, Result};
pub use keydir::{IndexEntry, KeyIndex};
pub use log::AppendLog;
pub use store::{Options, Stats, Store};
pub use types::{Key, Position, RecordKind, Timestamp, Value};
pub use wal::{LogSink, Record, SyncPolicy};
