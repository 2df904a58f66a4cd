use std::io;

use dfatrie_types::{hex_bytes, AcceptInfo};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrieError>;

#[derive(Debug, Error)]
pub enum TrieError {
    /// The same byte sequence was recorded twice with different accept info. The decoder model
    /// or the oracle is non-deterministic, so nothing built from it can be trusted.
    #[error("conflicting accept info for [{}]: {existing} vs {new}", hex_bytes(.sequence))]
    AcceptConflict {
        sequence: Vec<u8>,
        existing: AcceptInfo,
        new: AcceptInfo,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("trie json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not a trie image (format {0:?})")]
    InvalidFormat(String),

    #[error("unsupported trie image version {0}")]
    UnsupportedVersion(u32),

    #[error("corrupt trie image: {0}")]
    Corrupt(String),
}
