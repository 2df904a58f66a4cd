use std::collections::BTreeMap;

use dfatrie_types::AcceptInfo;

use crate::error::{Result, TrieError};

/// Builder-time trie owned by a single worker until it is canonicalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UncompressedNode {
    pub(crate) children: BTreeMap<u8, UncompressedNode>,
    pub(crate) accept: Option<AcceptInfo>,
}

impl UncompressedNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one accepted sequence, creating intermediate nodes as needed.
    ///
    /// Re-inserting a sequence with the same accept info is a no-op.
    pub fn insert(&mut self, sequence: &[u8], info: AcceptInfo) -> Result<()> {
        let mut node = self;
        for &byte in sequence {
            node = node.children.entry(byte).or_default();
        }
        match node.accept {
            Some(existing) if existing != info => Err(TrieError::AcceptConflict {
                sequence: sequence.to_vec(),
                existing,
                new: info,
            }),
            _ => {
                node.accept = Some(info);
                Ok(())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accept.is_none() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use dfatrie_types::{Gpr, InputRr};

    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut root = UncompressedNode::new();
        root.insert(&[0x90], AcceptInfo::EMPTY).unwrap();
        let snapshot = root.clone();
        root.insert(&[0x90], AcceptInfo::EMPTY).unwrap();
        assert_eq!(root, snapshot);
    }

    #[test]
    fn insert_rejects_conflicting_info() {
        let mut root = UncompressedNode::new();
        root.insert(&[0x4c, 0x89], AcceptInfo::EMPTY).unwrap();
        let err = root
            .insert(&[0x4c, 0x89], AcceptInfo::new(InputRr::Register(Gpr::R11), None))
            .unwrap_err();
        match err {
            TrieError::AcceptConflict { sequence, .. } => assert_eq!(sequence, vec![0x4c, 0x89]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn prefix_and_extension_coexist() {
        let mut root = UncompressedNode::new();
        root.insert(&[0x66], AcceptInfo::EMPTY).unwrap();
        root.insert(&[0x66, 0x90], AcceptInfo::EMPTY).unwrap();
        let child = &root.children[&0x66];
        assert_eq!(child.accept, Some(AcceptInfo::EMPTY));
        assert!(child.children.contains_key(&0x90));
    }
}
