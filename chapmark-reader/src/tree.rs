//! Arena tree of container elements
//!
//! Both the EBML walker and the MP4 box walker first parse the element
//! hierarchy into a [`Tree`] of `{kind, payload range, children}` nodes and
//! run their extraction passes over the finished tree. Payload bytes are
//! not held in the tree; leaves are read on demand through their range.

use std::ops::Range;

/// Index of a node within its [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct Node<K> {
    pub kind: K,
    /// Absolute byte range of the payload (header excluded)
    pub range: Range<u64>,
    children: Vec<NodeId>,
}

impl<K> Node<K> {
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Tree<K> {
    nodes: Vec<Node<K>>,
    roots: Vec<NodeId>,
}

impl<K> Default for Tree<K> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }
}

impl<K: Copy + PartialEq> Tree<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent` (or as a root) and return its id
    pub fn push(&mut self, parent: Option<NodeId>, kind: K, range: Range<u64>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            range,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &Node<K> {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> K {
        self.nodes[id.0].kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Children of `parent` (or roots) with the given kind, in file order
    pub fn children_of_kind(
        &self,
        parent: Option<NodeId>,
        kind: K,
    ) -> impl Iterator<Item = NodeId> + '_ {
        let candidates = match parent {
            Some(parent) => self.children(parent),
            None => self.roots(),
        };
        candidates
            .iter()
            .copied()
            .filter(move |child| self.kind(*child) == kind)
    }

    /// First child of `parent` (or first root) with the given kind
    pub fn child(&self, parent: Option<NodeId>, kind: K) -> Option<NodeId> {
        self.children_of_kind(parent, kind).next()
    }

    /// Follow a path of kinds from `parent`, taking the first match per step
    pub fn path(&self, parent: Option<NodeId>, kinds: &[K]) -> Option<NodeId> {
        let (first, rest) = kinds.split_first()?;
        let mut current = self.child(parent, *first)?;
        for kind in rest {
            current = self.child(Some(current), *kind)?;
        }
        Some(current)
    }
}
