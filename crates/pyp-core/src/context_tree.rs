//! Lazily grown context tree stored in an arena.
//!
//! Nodes live in one `Vec` and refer to their children by [`NodeId`]. Each
//! node id other than the root appears under exactly one parent edge, so the
//! structure is a tree even though storage is flat. Nodes are never removed;
//! a context whose customers all leave stays addressable with empty
//! restaurants.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::seating::pairs;

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Pitman-Yor parameters of one restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub discount: f64,
    pub concentration: f64,
}

impl Hyperparameters {
    /// `0 <= discount < 1` and `concentration > -discount`.
    pub fn is_valid(&self) -> bool {
        (0.0..1.0).contains(&self.discount) && self.concentration > -self.discount
    }
}

/// One context: its restaurant, its parameters and its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: Serialize, R: Serialize",
    deserialize = "C: DeserializeOwned + Ord, R: DeserializeOwned"
))]
pub struct ContextNode<C, R> {
    depth: usize,
    #[serde(with = "pairs")]
    children: BTreeMap<C, NodeId>,
    pub restaurant: R,
    pub hyper: Hyperparameters,
}

impl<C, R> ContextNode<C, R> {
    /// Level in the hierarchy; the root is at depth 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }
}

/// Arena-backed tree of context nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: Serialize, R: Serialize",
    deserialize = "C: DeserializeOwned + Ord, R: DeserializeOwned"
))]
pub struct ContextTree<C, R> {
    nodes: Vec<ContextNode<C, R>>,
}

impl<C: Ord + Clone, R> ContextTree<C, R> {
    /// A tree holding only the root.
    pub fn new(restaurant: R, hyper: Hyperparameters) -> Self {
        ContextTree {
            nodes: vec![ContextNode {
                depth: 1,
                children: BTreeMap::new(),
                restaurant,
                hyper,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn child(&self, id: NodeId, symbol: &C) -> Option<NodeId> {
        self.nodes[id.0].children.get(symbol).copied()
    }

    /// Existing child, or a new one built by `make(depth)`.
    pub fn child_or_insert<F>(&mut self, id: NodeId, symbol: &C, make: F) -> NodeId
    where
        F: FnOnce(usize) -> (R, Hyperparameters),
    {
        if let Some(child) = self.child(id, symbol) {
            return child;
        }
        let depth = self.nodes[id.0].depth + 1;
        let (restaurant, hyper) = make(depth);
        let child = NodeId(self.nodes.len());
        self.nodes.push(ContextNode {
            depth,
            children: BTreeMap::new(),
            restaurant,
            hyper,
        });
        self.nodes[id.0].children.insert(symbol.clone(), child);
        child
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.values().copied()
    }

    pub fn node(&self, id: NodeId) -> &ContextNode<C, R> {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ContextNode<C, R> {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ContextNode<C, R>)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// All nodes, for bulk updates that do not change the tree shape.
    pub fn nodes_mut(&mut self) -> &mut [ContextNode<C, R>] {
        &mut self.nodes
    }

    /// Every non-root node has exactly one parent edge, and child depths
    /// are one more than their parent's.
    pub fn is_tree(&self) -> bool {
        let mut parents = vec![0usize; self.nodes.len()];
        for node in &self.nodes {
            for child in node.children.values() {
                match parents.get_mut(child.0) {
                    Some(p) => *p += 1,
                    None => return false,
                }
                if self.nodes[child.0].depth != node.depth + 1 {
                    return false;
                }
            }
        }
        parents.first() == Some(&0) && parents[1..].iter().all(|&p| p == 1)
    }
}
