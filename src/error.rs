use std::io;

use thiserror::Error;

use crate::types::Position;

/// Unified error type for the store.
#[derive(Debug, Error)]
pub enum Error {
    /// Positional read past the end of the log.
    #[error("position {position} out of range (log length {len})")]
    OutOfRange { position: Position, len: u64 },

    /// The keydir points somewhere that is not a live record for the key.
    /// Never retried: it means the index and the log disagree.
    #[error("keydir entry for {key:?} at {position} does not resolve to a live record")]
    Desync { key: String, position: Position },

    /// IO failure in the durable sink.
    #[error("persistence error: {0}")]
    Persistence(#[from] io::Error),

    /// A key or value too long for the log's 32-bit length fields.
    #[error("record too large: key {key_len} bytes, value {value_len} bytes")]
    TooLarge { key_len: usize, value_len: usize },

    /// A log record failed checksum or format validation.
    #[error("corruption: {0}")]
    Corruption(String),
}

/// Result type alias used throughout the store.
pub type Result<T> = std::result::Result<T, Error>;
