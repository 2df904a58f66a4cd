//! Canonical, hash-consed tries over byte sequences.
//!
//! Workers build an [`UncompressedNode`] privately, then [`NodeCache::canonicalize`] it. The
//! orchestrator moves finished subtries between caches as [`TrieImage`]s and folds them together
//! with [`NodeCache::merge`]. Memory use is proportional to the number of distinct subtries, not
//! to the number of accepted sequences.

mod cache;
mod diff;
mod error;
mod image;
mod node;
mod uncompressed;

pub use cache::NodeCache;
pub use diff::diff_tries;
pub use error::{Result, TrieError};
pub use image::{
    read_trie, read_trie_file, write_trie, write_trie_file, NodeRecord, TrieImage, TRIE_FORMAT,
    TRIE_VERSION,
};
pub use node::{Node, NodeId};
pub use uncompressed::UncompressedNode;
