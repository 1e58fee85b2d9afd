use crate::error::{Error, Result};
use crate::types::{Key, RecordKind, Timestamp, Value};

/// The unit of the append log. Immutable once appended.
///
/// On-disk format:
/// ```text
/// ┌──────────┬─────────┬──────────┬──────────┬────────────┬───────────┬───────────┐
/// │ CRC (4B) │ Len (4B)│ Kind (1B)│ Time (8B)│ KeyLen (4B)│ Key (var) │ Val (var) │
/// └──────────┴─────────┴──────────┴──────────┴────────────┴───────────┴───────────┘
/// ```
///
/// CRC covers everything after the CRC field itself.
/// A tombstone always has an empty value; the kind byte alone marks deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Key,
    pub value: Value,
    pub kind: RecordKind,
    pub timestamp: Timestamp,
}

// Header sizes
const CRC_SIZE: usize = 4;
const LEN_SIZE: usize = 4;
const KIND_SIZE: usize = 1;
const TIMESTAMP_SIZE: usize = 8;
const KEY_LEN_SIZE: usize = 4;
const HEADER_SIZE: usize = CRC_SIZE + LEN_SIZE + KIND_SIZE + TIMESTAMP_SIZE + KEY_LEN_SIZE;

impl Record {
    /// Create a live write.
    pub fn put(key: impl Into<Key>, value: impl Into<Value>, timestamp: Timestamp) -> Self {
        Record {
            key: key.into(),
            value: value.into(),
            kind: RecordKind::Put,
            timestamp,
        }
    }

    /// Create a tombstone for `key`.
    pub fn tombstone(key: impl Into<Key>, timestamp: Timestamp) -> Self {
        Record {
            key: key.into(),
            value: Vec::new(),
            kind: RecordKind::Tombstone,
            timestamp,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.kind == RecordKind::Tombstone
    }

    /// Serialize this record to bytes (including CRC header).
    ///
    /// Fails with `TooLarge` rather than writing a frame whose length fields
    /// would wrap.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let key = self.key.as_bytes();
        let (payload_len, key_len) = frame_lengths(key.len(), self.value.len())?;
        let mut buf = Vec::with_capacity(CRC_SIZE + LEN_SIZE + payload_len as usize);

        // CRC placeholder, filled once the payload is in place
        buf.extend_from_slice(&[0u8; CRC_SIZE]);
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.push(self.kind as u8);
        buf.extend_from_slice(&self.timestamp.as_millis().to_le_bytes());
        buf.extend_from_slice(&key_len.to_le_bytes());
        buf.extend_from_slice(key);
        buf.extend_from_slice(&self.value);

        let crc = crc32fast::hash(&buf[CRC_SIZE..]);
        buf[0..CRC_SIZE].copy_from_slice(&crc.to_le_bytes());

        Ok(buf)
    }

    /// Deserialize a record from the front of `data`. Trailing bytes are ignored.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Corruption("record too short".into()));
        }

        let stored_crc = read_u32(data, 0)?;
        let payload_len = read_u32(data, CRC_SIZE)? as usize;

        let total_len = CRC_SIZE + LEN_SIZE + payload_len;
        if payload_len < HEADER_SIZE - CRC_SIZE - LEN_SIZE || data.len() < total_len {
            return Err(Error::Corruption("record truncated".into()));
        }

        let computed_crc = crc32fast::hash(&data[CRC_SIZE..total_len]);
        if stored_crc != computed_crc {
            return Err(Error::Corruption("CRC mismatch".into()));
        }

        let mut offset = CRC_SIZE + LEN_SIZE;

        let kind = RecordKind::from_u8(data[offset])?;
        offset += KIND_SIZE;

        let timestamp = Timestamp::from_millis(read_u64(data, offset)?);
        offset += TIMESTAMP_SIZE;

        let key_len = read_u32(data, offset)? as usize;
        offset += KEY_LEN_SIZE;

        if offset + key_len > total_len {
            return Err(Error::Corruption("key length exceeds record".into()));
        }
        let key = String::from_utf8(data[offset..offset + key_len].to_vec())
            .map_err(|_| Error::Corruption("key is not valid UTF-8".into()))?;
        offset += key_len;

        let value = data[offset..total_len].to_vec();
        if kind == RecordKind::Tombstone && !value.is_empty() {
            return Err(Error::Corruption("tombstone carries a value".into()));
        }

        Ok(Record {
            key,
            value,
            kind,
            timestamp,
        })
    }

    /// Size of this record when serialized on disk.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }
}

/// Payload and key length fields for a frame, if they fit in 32 bits.
fn frame_lengths(key_len: usize, value_len: usize) -> Result<(u32, u32)> {
    let too_large = || Error::TooLarge { key_len, value_len };
    let payload_len = (KIND_SIZE + TIMESTAMP_SIZE + KEY_LEN_SIZE)
        .checked_add(key_len)
        .and_then(|n| n.checked_add(value_len))
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(too_large)?;
    let key_len = u32::try_from(key_len).map_err(|_| too_large())?;
    Ok((payload_len, key_len))
}

fn read_u32(data: &[u8], at: usize) -> Result<u32> {
    data.get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| Error::Corruption("short read".into()))
}

fn read_u64(data: &[u8], at: usize) -> Result<u64> {
    data.get(at..at + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| Error::Corruption("short read".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_lengths_fit_u32() {
        let (payload, key) = frame_lengths(3, 5).unwrap();
        assert_eq!(key, 3);
        assert_eq!(payload as usize, KIND_SIZE + TIMESTAMP_SIZE + KEY_LEN_SIZE + 8);
    }

    #[test]
    fn oversized_value_is_rejected() {
        let value_len = u32::MAX as usize;
        assert!(matches!(
            frame_lengths(1, value_len),
            Err(Error::TooLarge { key_len: 1, .. })
        ));
    }

    #[test]
    fn oversized_lengths_do_not_overflow() {
        assert!(matches!(
            frame_lengths(usize::MAX, usize::MAX),
            Err(Error::TooLarge { .. })
        ));
    }
}
