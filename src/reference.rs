use std::fmt::{Display, Formatter};

/// Index of a nonterminal node inside a [`NodeStore`][crate::store::NodeStore].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    /// Returns the raw index value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the index for array access.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A reference to a diagram vertex: either a terminal carrying its value,
/// or a nonterminal node owned by the store.
///
/// Terminals are canonical by construction (two terminals with equal values
/// are equal references), and nonterminals are canonical because every one
/// of them is created through [`NodeStore::make_node`][crate::store::NodeStore::make_node].
/// Comparing two `Ref`s is therefore comparing the functions they denote.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Ref {
    Terminal(i32),
    Node(NodeId),
}

impl Ref {
    /// Boolean `false` terminal, as used by sets.
    pub const FALSE: Ref = Ref::Terminal(0);

    /// Boolean `true` terminal, as used by sets.
    pub const TRUE: Ref = Ref::Terminal(1);

    pub const fn is_terminal(self) -> bool {
        matches!(self, Ref::Terminal(_))
    }

    /// Returns the terminal value, or `None` for a nonterminal.
    pub const fn value(self) -> Option<i32> {
        match self {
            Ref::Terminal(value) => Some(value),
            Ref::Node(_) => None,
        }
    }

    /// Returns the node id, or `None` for a terminal.
    pub const fn id(self) -> Option<NodeId> {
        match self {
            Ref::Terminal(_) => None,
            Ref::Node(id) => Some(id),
        }
    }
}

impl From<NodeId> for Ref {
    fn from(id: NodeId) -> Self {
        Ref::Node(id)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ref::Terminal(value) => write!(f, "[{}]", value),
            Ref::Node(id) => write!(f, "{}", id),
        }
    }
}
