//! Per-variable unique tables.
//!
//! The node store keeps one [`Subtable`] for every address bit position.
//! Since all nodes in a subtable test the same variable, the hash key is just
//! the `(low, high)` pair of children:
//!
//! ```text
//! subtables[0]   → nodes testing the address MSB
//! subtables[1]   → nodes testing bit 1
//! ...
//! subtables[127] → nodes testing the last IPv6 bit
//! ```
//!
//! Looking a pair up here before allocating is what keeps every diagram in
//! the store reduced and shared.

use std::collections::HashMap;

use crate::reference::{NodeId, Ref};

/// A subtable storing nodes for a single variable.
#[derive(Debug, Clone, Default)]
pub struct Subtable {
    /// Map from (low, high) to node id.
    nodes: HashMap<(Ref, Ref), NodeId>,
}

impl Subtable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node by its children.
    pub fn find(&self, low: Ref, high: Ref) -> Option<NodeId> {
        self.nodes.get(&(low, high)).copied()
    }

    /// Register a node under its children.
    pub fn insert(&mut self, low: Ref, high: Ref, id: NodeId) {
        self.nodes.insert((low, high), id);
    }

    /// Get the number of nodes in this subtable.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
