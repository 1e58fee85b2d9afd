use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::types::Position;
use crate::wal::record::Record;
use crate::wal::{LogSink, SyncPolicy};

/// Appends log records to a single file on disk.
///
/// Each frame goes to the file in one `write_all`, no user-space buffer in
/// between, so a failed append has nothing left over to leak into the next
/// one. On any failure the file is cut back to where the frame started; if
/// even that fails the writer is poisoned and refuses further appends.
pub struct WalWriter {
    file: File,
    offset: u64,
    sync_policy: SyncPolicy,
    writes_since_sync: usize,
    poisoned: bool,
}

impl WalWriter {
    /// Open (or create) a log file and append after whatever it holds.
    pub fn new(path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let offset = file.metadata()?.len();
        Ok(Self::from_file(file, offset, sync_policy))
    }

    /// Open a log file, dropping everything past `valid_len` first.
    ///
    /// Used after replay stopped at a torn record: new appends must not land
    /// behind bytes no reader can get past.
    pub fn resume(path: &Path, valid_len: u64, sync_policy: SyncPolicy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();
        if len > valid_len {
            debug!(path = %path.display(), from = len, to = valid_len, "truncating torn log tail");
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        Ok(Self::from_file(file, valid_len.min(len), sync_policy))
    }

    fn from_file(file: File, offset: u64, sync_policy: SyncPolicy) -> Self {
        WalWriter {
            file,
            offset,
            sync_policy,
            writes_since_sync: 0,
            poisoned: false,
        }
    }

    /// Append a record. Depending on the SyncPolicy, may fsync after it.
    ///
    /// Either the whole frame is in the file and `Ok` is returned, or the
    /// file is back at its previous length and the error is returned.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        if self.poisoned {
            return Err(poisoned());
        }
        let encoded = record.encode()?;

        if let Err(e) = self.write_frame(&encoded) {
            warn!(offset = self.offset, error = %e, "log append failed, rolling back");
            self.rollback();
            return Err(e);
        }

        self.offset += encoded.len() as u64;
        Ok(())
    }

    fn write_frame(&mut self, encoded: &[u8]) -> Result<()> {
        self.file.write_all(encoded)?;

        let pending = self.writes_since_sync + 1;
        let due = match self.sync_policy {
            SyncPolicy::EveryWrite => true,
            SyncPolicy::EveryNWrites(n) => pending >= n,
            SyncPolicy::Manual => false,
        };
        if due {
            self.file.sync_all()?;
            self.writes_since_sync = 0;
        } else {
            self.writes_since_sync = pending;
        }
        Ok(())
    }

    /// Cut the file back to the end of the last acknowledged frame.
    fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.offset) {
            error!(offset = self.offset, error = %e, "log rollback failed, writer poisoned");
            self.poisoned = true;
        }
    }

    /// Force fsync to disk.
    pub fn sync(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(poisoned());
        }
        self.file.sync_all()?;
        self.writes_since_sync = 0;
        Ok(())
    }

    /// Current file length in bytes.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Records appended since the last fsync.
    pub fn writes_since_sync(&self) -> usize {
        self.writes_since_sync
    }

    /// True once a failed append could not be rolled back.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

fn poisoned() -> Error {
    Error::Persistence(io::Error::other("log writer poisoned by a failed rollback"))
}

impl LogSink for WalWriter {
    fn append(&mut self, position: Position, record: &Record) -> Result<()> {
        trace!(%position, offset = self.offset, "writing record");
        WalWriter::append(self, record)
    }

    fn sync(&mut self) -> Result<()> {
        WalWriter::sync(self)
    }
}
