use std::fs;
use std::io;
use std::path::Path;

use crate::error::Result;
use crate::wal::record::Record;

/// Reads log records back from a file to rebuild the store on open.
///
/// Loads the entire file into memory, then decodes record by record.
/// A missing file reads as an empty log.
pub struct WalReader {
    data: Vec<u8>,
}

impl WalReader {
    pub fn open(path: &Path) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(WalReader { data })
    }

    /// Wrap bytes already in memory.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        WalReader { data }
    }

    /// Total bytes in the file, valid or not.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> WalIterator<'_> {
        WalIterator {
            data: &self.data,
            offset: 0,
            stopped: false,
        }
    }
}

/// Iterator over log records. Yields records until EOF or the first bad one.
///
/// A frame that fails to decode is a partial write from a crash: appends
/// are sequential, so nothing valid can follow it.
pub struct WalIterator<'a> {
    data: &'a [u8],
    offset: usize,
    stopped: bool,
}

impl WalIterator<'_> {
    /// Bytes consumed by the records yielded so far.
    pub fn offset(&self) -> u64 {
        self.offset as u64
    }

    /// True once iteration ended on a record that failed to decode.
    pub fn hit_corruption(&self) -> bool {
        self.stopped
    }
}

impl Iterator for WalIterator<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped || self.offset >= self.data.len() {
            return None;
        }

        match Record::decode(&self.data[self.offset..]) {
            Ok(record) => {
                self.offset += record.encoded_size();
                Some(record)
            }
            Err(_) => {
                self.stopped = true;
                None
            }
        }
    }
}
