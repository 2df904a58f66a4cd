use dfatrie_types::AcceptInfo;

/// Index of a canonical node inside the [`crate::NodeCache`] that created it.
///
/// Ids are only meaningful within one cache; moving a trie between caches goes through
/// [`crate::TrieImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A canonical trie node.
///
/// A sequence that is both a complete instruction and a prefix of longer ones is a `Branch`
/// carrying accept info. A `Branch` never has zero children *and* accept info; that shape is
/// always a `Leaf`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Leaf(AcceptInfo),
    Branch {
        /// Sorted by byte, no duplicates.
        children: Box<[(u8, NodeId)]>,
        accept: Option<AcceptInfo>,
    },
}

impl Node {
    pub(crate) fn new(children: Vec<(u8, NodeId)>, accept: Option<AcceptInfo>) -> Node {
        debug_assert!(children.windows(2).all(|w| w[0].0 < w[1].0));
        match (children.is_empty(), accept) {
            (true, Some(info)) => Node::Leaf(info),
            _ => Node::Branch {
                children: children.into_boxed_slice(),
                accept,
            },
        }
    }

    pub(crate) fn empty() -> Node {
        Node::Branch {
            children: Box::new([]),
            accept: None,
        }
    }

    pub fn children(&self) -> &[(u8, NodeId)] {
        match self {
            Node::Leaf(_) => &[],
            Node::Branch { children, .. } => children,
        }
    }

    pub fn accept(&self) -> Option<&AcceptInfo> {
        match self {
            Node::Leaf(info) => Some(info),
            Node::Branch { accept, .. } => accept.as_ref(),
        }
    }

    pub fn child(&self, byte: u8) -> Option<NodeId> {
        let children = self.children();
        children
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|pos| children[pos].1)
    }

    pub fn is_empty(&self) -> bool {
        self.accept().is_none() && self.children().is_empty()
    }
}
