//! The hash-consed node store.
//!
//! A [`NodeStore`] owns every nonterminal node of every diagram built through
//! it. Nodes are immutable once created and are never removed, so a [`Ref`]
//! handed out by the store stays valid for the store's whole lifetime.
//!
//! All nonterminals are created by [`NodeStore::make_node`], which
//!
//! 1. elides redundant tests (`low == high` returns `low`), and
//! 2. returns the existing node when `(variable, low, high)` is already known.
//!
//! Together these keep every diagram reduced and ordered, so two diagrams
//! denote the same address→value function iff their roots are equal.
//!
//! The mutable tables live behind a single [`parking_lot::Mutex`]. Diagram
//! algorithms take the lock once and then work on [`Nodes`] directly.

use std::collections::HashSet;
use std::fmt::Debug;

use log::debug;
use parking_lot::{Mutex, MutexGuard};

use crate::address::Family;
use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::reference::{NodeId, Ref};
use crate::subtable::Subtable;

/// Largest number of nonterminals a store can hold.
pub const MAX_NODES: usize = u32::MAX as usize;

/// Sizing knobs for a [`NodeStore`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StoreConfig {
    /// Initial node capacity is `2^capacity_bits`.
    pub capacity_bits: usize,
    /// Initial computed-table capacity is `2^cache_bits`.
    pub cache_bits: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity_bits: 16,
            cache_bits: 14,
        }
    }
}

impl StoreConfig {
    pub fn with_capacity_bits(mut self, bits: usize) -> Self {
        self.capacity_bits = bits;
        self
    }

    pub fn with_cache_bits(mut self, bits: usize) -> Self {
        self.cache_bits = bits;
        self
    }
}

/// Binary operations memoised in the computed table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) enum OpKey {
    Union(Ref, Ref),
    Intersection(Ref, Ref),
    Difference(Ref, Ref),
}

/// The tables guarded by the store lock.
pub(crate) struct Nodes {
    nodes: Vec<Node>,
    subtables: Vec<Subtable>,
    pub(crate) ops: Cache<OpKey, Ref>,
}

impl Nodes {
    fn new(config: &StoreConfig) -> Self {
        assert!(
            config.capacity_bits <= 31,
            "Capacity bits should be in the range 0..=31"
        );
        Self {
            nodes: Vec::with_capacity(1 << config.capacity_bits),
            subtables: Vec::new(),
            ops: Cache::new(config.cache_bits),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> Node {
        self.nodes[id.index()]
    }

    /// Variable tested at `r`, or `limit` for terminals.
    pub(crate) fn level(&self, r: Ref, limit: u32) -> u32 {
        match r {
            Ref::Terminal(_) => limit,
            Ref::Node(id) => self.nodes[id.index()].variable,
        }
    }

    pub(crate) fn reserve(&mut self, additional: usize) -> std::result::Result<(), std::collections::TryReserveError> {
        self.nodes.try_reserve(additional)
    }

    pub(crate) fn make_node(&mut self, variable: u32, low: Ref, high: Ref) -> Ref {
        if low == high {
            debug!("mk(x{}): redundant, {} == {}", variable, low, high);
            return low;
        }

        debug_assert!(
            self.level(low, u32::MAX) > variable && self.level(high, u32::MAX) > variable,
            "children of x{} must test later variables",
            variable
        );

        let index = variable as usize;
        if index >= self.subtables.len() {
            self.subtables.resize_with(index + 1, Subtable::new);
        }

        if let Some(id) = self.subtables[index].find(low, high) {
            debug!("mk(x{}, {}, {}): reuse {}", variable, low, high, id);
            return Ref::Node(id);
        }

        assert!(self.nodes.len() < MAX_NODES, "Node store is full");
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node::new(variable, low, high));
        self.subtables[index].insert(low, high, id);
        debug!("mk(x{}, {}, {}): new {}", variable, low, high, id);
        Ref::Node(id)
    }

    /// Distinct vertices reachable from `roots`, terminals included.
    pub(crate) fn descendants(&self, roots: impl IntoIterator<Item = Ref>) -> HashSet<Ref> {
        let mut visited = HashSet::new();
        let mut stack: Vec<Ref> = roots.into_iter().collect();

        while let Some(r) = stack.pop() {
            if visited.insert(r) {
                if let Ref::Node(id) = r {
                    let node = self.node(id);
                    stack.push(node.low);
                    stack.push(node.high);
                }
            }
        }

        visited
    }
}

/// Process-wide (or test-local) owner of all diagram nodes.
///
/// # Examples
///
/// ```
/// use ipset_rs::reference::Ref;
/// use ipset_rs::store::NodeStore;
///
/// let store = NodeStore::new();
/// let t = store.terminal(1);
/// assert_eq!(t, Ref::TRUE);
///
/// let a = store.make_node(3, Ref::FALSE, t)?;
/// let b = store.make_node(3, Ref::FALSE, t)?;
/// assert_eq!(a, b);
/// assert_eq!(store.make_node(3, t, t)?, t);
///
/// // Children must test later variables.
/// assert!(store.make_node(5, a, t).is_err());
/// # Ok::<(), ipset_rs::error::Error>(())
/// ```
pub struct NodeStore {
    inner: Mutex<Nodes>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Mutex::new(Nodes::new(&config)),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Nodes> {
        self.inner.lock()
    }

    /// Returns the canonical terminal carrying `value`.
    pub fn terminal(&self, value: i32) -> Ref {
        Ref::Terminal(value)
    }

    /// Returns the unique node testing `variable` with the given children.
    ///
    /// Fails with [`Error::InvalidArgument`] unless `variable` is an address
    /// bit and both children are terminals or test strictly later variables.
    pub fn make_node(&self, variable: u32, low: Ref, high: Ref) -> Result<Ref> {
        let limit = Family::V6.width();
        if variable >= limit {
            return Err(Error::invalid(format!(
                "variable x{} is out of range 0..{}",
                variable, limit
            )));
        }
        let mut nodes = self.lock();
        for child in [low, high] {
            if let Ref::Node(id) = child {
                if id.index() >= nodes.len() {
                    return Err(Error::invalid(format!("{} is not in this store", id)));
                }
            }
            let level = nodes.level(child, limit);
            if level <= variable {
                return Err(Error::invalid(format!(
                    "child {} of x{} tests x{}",
                    child, variable, level
                )));
            }
        }
        Ok(nodes.make_node(variable, low, high))
    }

    /// Returns the contents of a nonterminal.
    pub fn node(&self, id: NodeId) -> Node {
        self.lock().node(id)
    }

    /// Number of nonterminals currently in the store.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct vertices (terminals included) reachable from `roots`.
    ///
    /// Shared subdiagrams are counted once.
    pub fn reachable_size(&self, roots: impl IntoIterator<Item = Ref>) -> usize {
        self.lock().descendants(roots).len()
    }

    /// Number of distinct nonterminals reachable from `roots`.
    pub fn reachable_nodes(&self, roots: impl IntoIterator<Item = Ref>) -> usize {
        self.lock()
            .descendants(roots)
            .into_iter()
            .filter(|r| !r.is_terminal())
            .count()
    }

    /// Bytes occupied by the nonterminals reachable from `roots`.
    pub fn memory_size(&self, roots: impl IntoIterator<Item = Ref>) -> usize {
        self.reachable_nodes(roots) * std::mem::size_of::<Node>()
    }

    pub fn stats(&self) -> StoreStats {
        let nodes = self.lock();
        StoreStats {
            nodes: nodes.len(),
            cache_entries: nodes.ops.len(),
            cache_hits: nodes.ops.hits(),
            cache_misses: nodes.ops.misses(),
        }
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        NodeStore::new()
    }
}

impl Debug for NodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("NodeStore")
            .field("nodes", &stats.nodes)
            .field("cache_entries", &stats.cache_entries)
            .field("cache_hits", &stats.cache_hits)
            .field("cache_misses", &stats.cache_misses)
            .finish()
    }
}

/// Snapshot of store counters.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StoreStats {
    pub nodes: usize,
    pub cache_entries: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}
