//! The nesting tree for closed clip output.
//!
//! Each node owns one polygon ring; its children are the rings directly
//! inside it. Children of the root are outermost polygons, their children
//! are holes, the holes' children are islands, and so on alternately. The
//! tree is arena-backed: nodes are addressed by [`PolyNodeId`] and live as
//! long as the tree.

use serde::{Deserialize, Serialize};

use crate::geom::{Path64, PathD};

/// Index of a node in a [`PolyTree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolyNodeId(usize);

impl std::fmt::Debug for PolyNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n_{}", self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PolyNode<P> {
    parent: Option<PolyNodeId>,
    polygon: Option<P>,
    children: Vec<PolyNodeId>,
}

/// A tree of nested polygons. Node 0 is a synthetic root carrying no
/// polygon; every other node was added beneath some parent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolyTree<P> {
    nodes: Vec<PolyNode<P>>,
}

pub type PolyTree64 = PolyTree<Path64>;
pub type PolyTreeD = PolyTree<PathD>;

impl<P> PolyTree<P> {
    pub fn new() -> Self {
        PolyTree {
            nodes: vec![PolyNode {
                parent: None,
                polygon: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> PolyNodeId {
        PolyNodeId(0)
    }

    pub(crate) fn add_child(&mut self, parent: PolyNodeId, polygon: P) -> PolyNodeId {
        let id = PolyNodeId(self.nodes.len());
        self.nodes.push(PolyNode {
            parent: Some(parent),
            polygon: Some(polygon),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn parent(&self, node: PolyNodeId) -> Option<PolyNodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: PolyNodeId) -> &[PolyNodeId] {
        &self.nodes[node.0].children
    }

    /// The node's polygon ring; `None` only for the root.
    pub fn polygon(&self, node: PolyNodeId) -> Option<&P> {
        self.nodes[node.0].polygon.as_ref()
    }

    /// Depth below the root: outermost polygons are at level 1.
    pub fn level(&self, node: PolyNodeId) -> usize {
        let mut level = 0;
        let mut n = node;
        while let Some(p) = self.nodes[n.0].parent {
            level += 1;
            n = p;
        }
        level
    }

    /// Whether this node's ring bounds a hole. Odd levels are filled
    /// regions, even non-root levels are holes.
    pub fn is_hole(&self, node: PolyNodeId) -> bool {
        let level = self.level(node);
        level != 0 && level % 2 == 0
    }

    /// Number of polygon-bearing nodes (the root doesn't count).
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// All polygons in insertion order, paired with their node ids.
    pub fn polygons(&self) -> impl Iterator<Item = (PolyNodeId, &P)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.polygon.as_ref().map(|p| (PolyNodeId(i), p)))
    }

    /// Rebuilds the tree with every polygon mapped through `f`, preserving
    /// the node structure (ids stay valid across the mapping).
    pub fn map<Q>(&self, mut f: impl FnMut(&P) -> Q) -> PolyTree<Q> {
        PolyTree {
            nodes: self
                .nodes
                .iter()
                .map(|n| PolyNode {
                    parent: n.parent,
                    polygon: n.polygon.as_ref().map(&mut f),
                    children: n.children.clone(),
                })
                .collect(),
        }
    }
}

impl<P> Default for PolyTree<P> {
    fn default() -> Self {
        Self::new()
    }
}
