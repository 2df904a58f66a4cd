//! Flat, versioned representation of a canonical trie.
//!
//! The same image is used to hand a finished subtrie from a worker to the orchestrator and to
//! persist the final trie. Nodes are listed in post-order (children in ascending byte order, the
//! first visit of a node assigns its index), so an image is a pure function of the trie's shape:
//! structurally equal tries produce identical images and identical files.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use dfatrie_types::AcceptInfo;
use serde::{Deserialize, Serialize};

use crate::cache::NodeCache;
use crate::error::{Result, TrieError};
use crate::node::{Node, NodeId};

pub const TRIE_FORMAT: &str = "dfatrie.trie";
pub const TRIE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieImage {
    pub format: String,
    pub version: u32,
    pub root: u32,
    pub nodes: Vec<NodeRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<u8, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<AcceptInfo>,
}

impl TrieImage {
    fn check_header(&self) -> Result<()> {
        if self.format != TRIE_FORMAT {
            return Err(TrieError::InvalidFormat(self.format.clone()));
        }
        if self.version != TRIE_VERSION {
            return Err(TrieError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

impl NodeCache {
    pub fn export(&self, root: NodeId) -> TrieImage {
        let mut numbering = HashMap::new();
        let mut nodes = Vec::new();
        let root = self.export_node(root, &mut numbering, &mut nodes);
        TrieImage {
            format: TRIE_FORMAT.to_string(),
            version: TRIE_VERSION,
            root,
            nodes,
        }
    }

    fn export_node(
        &self,
        id: NodeId,
        numbering: &mut HashMap<NodeId, u32>,
        nodes: &mut Vec<NodeRecord>,
    ) -> u32 {
        if let Some(&index) = numbering.get(&id) {
            return index;
        }
        let node = self.node(id);
        let children = node
            .children()
            .iter()
            .map(|&(byte, child)| (byte, self.export_node(child, numbering, nodes)))
            .collect();
        // Indices are bounded by the cache size, which is itself bounded by u32.
        let index = nodes.len() as u32;
        nodes.push(NodeRecord {
            children,
            accept: node.accept().copied(),
        });
        numbering.insert(id, index);
        index
    }

    /// Interns every node of `image` into this cache and returns the root.
    pub fn import(&mut self, image: &TrieImage) -> Result<NodeId> {
        image.check_header()?;
        let mut ids: Vec<NodeId> = Vec::with_capacity(image.nodes.len());
        for (index, record) in image.nodes.iter().enumerate() {
            let mut children = Vec::with_capacity(record.children.len());
            for (&byte, &child) in &record.children {
                let child_id = ids.get(child as usize).copied().ok_or_else(|| {
                    TrieError::Corrupt(format!(
                        "node {index} refers to child {child}, which is not defined before it"
                    ))
                })?;
                if child_id == self.empty() {
                    return Err(TrieError::Corrupt(format!(
                        "node {index} has an empty child at byte {byte:#04x}"
                    )));
                }
                children.push((byte, child_id));
            }
            ids.push(self.intern(Node::new(children, record.accept)));
        }
        ids.get(image.root as usize).copied().ok_or_else(|| {
            TrieError::Corrupt(format!(
                "root {} out of range ({} nodes)",
                image.root,
                image.nodes.len()
            ))
        })
    }
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Writes `image` as compact JSON. The file only appears at `path` once it is complete.
pub fn write_trie_file(path: &Path, image: &TrieImage) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = temporary_sibling(path);
    {
        let mut out = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut out, image)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), nodes = image.nodes.len(), "wrote trie image");
    Ok(())
}

pub fn read_trie_file(path: &Path) -> Result<TrieImage> {
    let image: TrieImage = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    image.check_header()?;
    Ok(image)
}

/// Exports `root` and writes it to `path`.
pub fn write_trie(cache: &NodeCache, root: NodeId, path: &Path) -> Result<()> {
    write_trie_file(path, &cache.export(root))
}

/// Reads a trie file into `cache` and returns its root.
pub fn read_trie(cache: &mut NodeCache, path: &Path) -> Result<NodeId> {
    let image = read_trie_file(path)?;
    cache.import(&image)
}
