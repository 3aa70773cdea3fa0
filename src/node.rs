use std::fmt::{Display, Formatter};

use crate::reference::Ref;

/// A nonterminal decision node.
///
/// `variable` is the 0-based address bit tested here, counted from the most
/// significant bit. `low` is followed when the bit is 0, `high` when it is 1.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Node {
    pub variable: u32,
    pub low: Ref,
    pub high: Ref,
}

impl Node {
    pub const fn new(variable: u32, low: Ref, high: Ref) -> Self {
        Self { variable, low, high }
    }

    /// Returns the child selected by the given bit value.
    pub const fn child(&self, bit: bool) -> Ref {
        if bit {
            self.high
        } else {
            self.low
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(x{}? {} : {})", self.variable, self.high, self.low)
    }
}
