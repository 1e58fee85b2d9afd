use tracing::trace;

use crate::error::{Error, Result};
use crate::types::Position;
use crate::wal::{LogSink, Record};

/// Ordered, append-only sequence of records.
///
/// A record's position is its index in the sequence. Positions are handed
/// out in strictly increasing order and stay valid for the life of the log:
/// nothing is ever removed or rewritten.
///
/// An optional [`LogSink`] receives each record before it becomes visible.
pub struct AppendLog {
    records: Vec<Record>,
    sink: Option<Box<dyn LogSink>>,
}

impl AppendLog {
    /// Create an empty, memory-only log.
    pub fn new() -> Self {
        AppendLog {
            records: Vec::new(),
            sink: None,
        }
    }

    /// Create a log that mirrors every append to `sink`.
    pub fn with_sink(sink: Box<dyn LogSink>) -> Self {
        AppendLog {
            records: Vec::new(),
            sink: Some(sink),
        }
    }

    /// Attach a sink to a log that was built up in memory (e.g. by replay).
    /// Records already present are not sent to it.
    pub fn attach_sink(&mut self, sink: Box<dyn LogSink>) {
        self.sink = Some(sink);
    }

    /// Append a record and return its position.
    ///
    /// Without a sink this cannot fail. With one, a sink error leaves the log
    /// untouched: no position is consumed and the record is not readable.
    pub fn append(&mut self, record: Record) -> Result<Position> {
        let position = Position::new(self.records.len() as u64);
        if let Some(sink) = self.sink.as_mut() {
            sink.append(position, &record)?;
        }
        trace!(%position, key = %record.key, tombstone = record.is_tombstone(), "appended");
        self.records.push(record);
        Ok(position)
    }

    /// Record at `position`, or `OutOfRange` if it was never issued.
    pub fn read_at(&self, position: Position) -> Result<&Record> {
        usize::try_from(position.as_u64())
            .ok()
            .and_then(|i| self.records.get(i))
            .ok_or(Error::OutOfRange {
                position,
                len: self.len(),
            })
    }

    /// Number of records appended so far.
    pub fn len(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in append order, with their positions.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Record)> + '_ {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (Position::new(i as u64), r))
    }

    /// Flush the sink to stable storage. No-op for a memory-only log.
    pub fn sync(&mut self) -> Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.sync(),
            None => Ok(()),
        }
    }
}

impl Default for AppendLog {
    fn default() -> Self {
        Self::new()
    }
}
