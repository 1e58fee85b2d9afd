//! Durable backing for the append log.
//!
//! The in-memory [`AppendLog`](crate::log::AppendLog) is the source of truth
//! while the process runs; a [`LogSink`] mirrors every record to somewhere
//! that survives it. [`writer::WalWriter`] is the file-backed sink and
//! [`reader::WalReader`] replays what it wrote.

pub mod reader;
pub mod record;
pub mod writer;

pub use reader::{WalIterator, WalReader};
pub use record::Record;
pub use writer::WalWriter;

use crate::error::Result;
use crate::types::Position;

/// Controls when the log file is fsync'd to disk.
///
/// Trade-off: durability vs throughput.
///   - EveryWrite: zero data loss, slowest
///   - EveryNWrites: lose up to N writes on crash
///   - Manual: only when the caller asks via `sync()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// fsync after every record.
    #[default]
    EveryWrite,
    /// fsync every N records.
    EveryNWrites(usize),
    /// Never fsync implicitly.
    Manual,
}

/// A durable append-only destination for log records.
///
/// The log calls `append` before a record becomes visible in memory, so an
/// error here means the record was never written as far as readers are
/// concerned. Implementations must not retry on their own.
pub trait LogSink: Send + Sync {
    /// Persist `record`, which the log will expose at `position`.
    fn append(&mut self, position: Position, record: &Record) -> Result<()>;

    /// Force everything appended so far onto stable storage.
    fn sync(&mut self) -> Result<()>;
}
