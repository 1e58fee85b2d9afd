use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Key identifier.
pub type Key = String;

/// Opaque value bytes.
pub type Value = Vec<u8>;

/// Location of a record in the append log.
///
/// Assigned once at append time and never reused. Kept opaque so the log
/// can be backed by file offsets without changing the keydir's contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u64);

impl Position {
    pub const fn new(raw: u64) -> Self {
        Position(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Wall-clock now. A clock set before the epoch reads as zero.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Timestamp(millis)
    }
}

/// Distinguishes live writes from deletes.
/// A tombstone is a record of its own, not a magic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A normal put.
    Put = 0x01,
    /// A delete marker.
    Tombstone = 0x02,
}

impl RecordKind {
    pub(crate) fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(RecordKind::Put),
            0x02 => Ok(RecordKind::Tombstone),
            _ => Err(Error::Corruption(format!("invalid record kind: {byte}"))),
        }
    }
}
