use std::collections::HashMap;

use dfatrie_types::AcceptInfo;

use crate::error::{Result, TrieError};
use crate::node::{Node, NodeId};
use crate::uncompressed::UncompressedNode;

/// Content-addressed arena of canonical trie nodes.
///
/// Every node is interned: two nodes with the same children and accept info always get the same
/// [`NodeId`], so structural equality of tries held in one cache is id equality. No child id ever
/// refers to the empty node.
#[derive(Debug, Clone)]
pub struct NodeCache {
    nodes: Vec<Node>,
    index: HashMap<Node, NodeId>,
    empty: NodeId,
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeCache {
    pub fn new() -> Self {
        let mut cache = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            empty: NodeId(0),
        };
        cache.empty = cache.intern(Node::empty());
        cache
    }

    /// The node with no children and no accept info.
    pub fn empty(&self) -> NodeId {
        self.empty
    }

    /// Number of distinct nodes interned so far (including the empty node).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Resolves an id returned by this cache.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this cache and is out of its range. Ids from another
    /// cache that happen to be in range resolve to an unrelated node.
    pub fn node(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.index()) {
            Some(node) => node,
            None => panic!(
                "node id {} out of range for a cache of {} nodes",
                id.index(),
                self.nodes.len()
            ),
        }
    }

    pub(crate) fn intern(&mut self, node: Node) -> NodeId {
        if let Some(&id) = self.index.get(&node) {
            return id;
        }
        let id = NodeId(
            u32::try_from(self.nodes.len()).expect("node cache exceeds u32::MAX entries"),
        );
        self.nodes.push(node.clone());
        self.index.insert(node, id);
        id
    }

    /// Hash-conses a worker's builder trie into this cache.
    pub fn canonicalize(&mut self, root: &UncompressedNode) -> NodeId {
        let mut children = Vec::with_capacity(root.children.len());
        for (&byte, child) in &root.children {
            let id = self.canonicalize(child);
            if id != self.empty {
                children.push((byte, id));
            }
        }
        self.intern(Node::new(children, root.accept))
    }

    /// Union of two tries held in this cache.
    ///
    /// Commutative, associative and idempotent. A sequence accepted by both sides with different
    /// accept info is an [`TrieError::AcceptConflict`].
    pub fn merge(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let mut memo = HashMap::new();
        let mut path = Vec::new();
        self.merge_at(a, b, &mut path, &mut memo)
    }

    fn merge_at(
        &mut self,
        a: NodeId,
        b: NodeId,
        path: &mut Vec<u8>,
        memo: &mut HashMap<(NodeId, NodeId), NodeId>,
    ) -> Result<NodeId> {
        if a == b || b == self.empty {
            return Ok(a);
        }
        if a == self.empty {
            return Ok(b);
        }
        let key = (a.min(b), a.max(b));
        if let Some(&merged) = memo.get(&key) {
            return Ok(merged);
        }

        let accept = match (self.node(a).accept(), self.node(b).accept()) {
            (Some(&x), Some(&y)) if x != y => {
                return Err(TrieError::AcceptConflict {
                    sequence: path.clone(),
                    existing: x,
                    new: y,
                })
            }
            (Some(&x), _) => Some(x),
            (None, y) => y.copied(),
        };

        // Children are cloned out because recursion interns new nodes into `self.nodes`.
        let left = self.node(a).children().to_vec();
        let right = self.node(b).children().to_vec();
        let mut children = Vec::with_capacity(left.len().max(right.len()));
        let (mut i, mut j) = (0, 0);
        while i < left.len() || j < right.len() {
            let (byte, ca, cb) = match (left.get(i), right.get(j)) {
                (Some(&(ba, ca)), Some(&(bb, cb))) if ba == bb => {
                    i += 1;
                    j += 1;
                    (ba, ca, cb)
                }
                (Some(&(ba, ca)), Some(&(bb, _))) if ba < bb => {
                    i += 1;
                    (ba, ca, self.empty)
                }
                (Some(&(ba, ca)), None) => {
                    i += 1;
                    (ba, ca, self.empty)
                }
                (_, Some(&(bb, cb))) => {
                    j += 1;
                    (bb, self.empty, cb)
                }
                (None, None) => unreachable!(),
            };
            path.push(byte);
            let merged = self.merge_at(ca, cb, path, memo)?;
            path.pop();
            children.push((byte, merged));
        }

        let merged = self.intern(Node::new(children, accept));
        memo.insert(key, merged);
        Ok(merged)
    }

    /// Accept info recorded for exactly `sequence`, if the trie accepts it.
    pub fn lookup(&self, root: NodeId, sequence: &[u8]) -> Option<&AcceptInfo> {
        let mut node = root;
        for &byte in sequence {
            node = self.node(node).child(byte)?;
        }
        self.node(node).accept()
    }

    /// Every accepted sequence with its accept info, in lexicographic byte order.
    pub fn sequences(&self, root: NodeId) -> Vec<(Vec<u8>, AcceptInfo)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_sequences(root, &mut path, &mut out);
        out
    }

    fn collect_sequences(
        &self,
        id: NodeId,
        path: &mut Vec<u8>,
        out: &mut Vec<(Vec<u8>, AcceptInfo)>,
    ) {
        let node = self.node(id);
        if let Some(info) = node.accept() {
            out.push((path.clone(), *info));
        }
        for &(byte, child) in node.children() {
            path.push(byte);
            self.collect_sequences(child, path, out);
            path.pop();
        }
    }

    /// Number of accepted sequences, computed over distinct nodes only.
    pub fn count_sequences(&self, root: NodeId) -> u64 {
        let mut memo = HashMap::new();
        self.count_at(root, &mut memo)
    }

    fn count_at(&self, id: NodeId, memo: &mut HashMap<NodeId, u64>) -> u64 {
        if let Some(&count) = memo.get(&id) {
            return count;
        }
        let node = self.node(id);
        let mut count = u64::from(node.accept().is_some());
        for &(_, child) in node.children() {
            count += self.count_at(child, memo);
        }
        memo.insert(id, count);
        count
    }
}

#[cfg(test)]
mod tests {
    use dfatrie_types::{Gpr, InputRr};

    use super::*;

    fn build(cache: &mut NodeCache, seqs: &[&[u8]]) -> NodeId {
        let mut root = UncompressedNode::new();
        for seq in seqs {
            root.insert(seq, AcceptInfo::EMPTY).unwrap();
        }
        cache.canonicalize(&root)
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn foreign_node_id_out_of_range_panics() {
        let mut big = NodeCache::new();
        let id = build(&mut big, &[&[0x0f, 0x1f, 0x00], &[0x90]]);
        let small = NodeCache::new();
        small.node(id);
    }

    #[test]
    fn canonicalize_round_trips_lookups() {
        let mut cache = NodeCache::new();
        let mut root = UncompressedNode::new();
        let r11 = AcceptInfo::new(InputRr::Register(Gpr::R11), None);
        root.insert(&[0x90], AcceptInfo::EMPTY).unwrap();
        root.insert(&[0x4b, 0x8b, 0x04, 0x1f], r11).unwrap();
        let id = cache.canonicalize(&root);

        assert_eq!(cache.lookup(id, &[0x90]), Some(&AcceptInfo::EMPTY));
        assert_eq!(cache.lookup(id, &[0x4b, 0x8b, 0x04, 0x1f]), Some(&r11));
        assert_eq!(cache.lookup(id, &[0x4b, 0x8b]), None);
        assert_eq!(cache.lookup(id, &[]), None);
        assert_eq!(cache.count_sequences(id), 2);
    }

    #[test]
    fn identical_subtries_share_one_node() {
        let mut cache = NodeCache::new();
        let id = build(&mut cache, &[&[0x01, 0x90], &[0x02, 0x90]]);
        let root = cache.node(id);
        assert_eq!(root.child(0x01), root.child(0x02));
        // empty, leaf, shared [0x90] branch, root
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn merge_of_disjoint_siblings() {
        let mut cache = NodeCache::new();
        let a = build(&mut cache, &[&[0x01, 0x02]]);
        let b = build(&mut cache, &[&[0x01, 0x03]]);
        let merged = cache.merge(a, b).unwrap();

        assert!(cache.lookup(merged, &[0x01, 0x02]).is_some());
        assert!(cache.lookup(merged, &[0x01, 0x03]).is_some());
        assert!(cache.lookup(merged, &[0x01]).is_none());
        assert!(cache.lookup(merged, &[0x01, 0x04]).is_none());
        assert_eq!(
            cache.sequences(merged),
            vec![
                (vec![0x01, 0x02], AcceptInfo::EMPTY),
                (vec![0x01, 0x03], AcceptInfo::EMPTY)
            ]
        );
    }

    #[test]
    fn merge_with_empty_and_self_is_identity() {
        let mut cache = NodeCache::new();
        let a = build(&mut cache, &[&[0x90], &[0x0f, 0x0b]]);
        let empty = cache.empty();
        assert_eq!(cache.merge(a, empty).unwrap(), a);
        assert_eq!(cache.merge(empty, a).unwrap(), a);
        assert_eq!(cache.merge(a, a).unwrap(), a);
    }

    #[test]
    fn merge_conflict_reports_sequence() {
        let mut cache = NodeCache::new();
        let a = build(&mut cache, &[&[0x01, 0x02]]);
        let mut other = UncompressedNode::new();
        other
            .insert(&[0x01, 0x02], AcceptInfo::new(InputRr::AnyNonSpecial, None))
            .unwrap();
        let b = cache.canonicalize(&other);

        match cache.merge(a, b).unwrap_err() {
            TrieError::AcceptConflict { sequence, .. } => assert_eq!(sequence, vec![0x01, 0x02]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn canonicalizing_empty_builder_yields_empty_node() {
        let mut cache = NodeCache::new();
        let id = cache.canonicalize(&UncompressedNode::new());
        assert_eq!(id, cache.empty());
        assert!(cache.is_empty());
    }
}
