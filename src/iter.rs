//! Lazy enumeration of the addresses or CIDR blocks whose value matches a predicate.
//!
//! The [`Cursor`] walks a diagram depth-first, low branch before high, using
//! an explicit stack bounded by the address width. A vertex reached at depth
//! `d` that tests a later variable stands for both halves of bit `d`, so the
//! walk branches to it twice. The walk stops at every terminal. Canonical
//! elision removes every node whose children are equal, so the prefixes
//! emitted at matching terminals are the largest aligned blocks possible.
//!
//! Both address families of a container are walked in turn, IPv4 first.

use std::collections::VecDeque;

use log::trace;

use crate::address::{Family, Network};
use crate::diagram::Diagram;
use crate::reference::Ref;
use crate::store::NodeStore;

/// Predicate over terminal values.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Matcher {
    /// Matches exactly this value.
    Equal(i32),
    /// Matches everything but this value; usually a map's default.
    NotEqual(i32),
}

impl Matcher {
    pub fn matches(&self, value: i32) -> bool {
        match *self {
            Matcher::Equal(v) => value == v,
            Matcher::NotEqual(v) => value != v,
        }
    }
}

/// One emitted item: a network (a single host when iterating addresses)
/// together with the value every address in it maps to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Block {
    pub network: Network,
    pub value: i32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Branch {
    Low,
    High,
    Done,
}

#[derive(Debug)]
struct Frame {
    depth: u32,
    low: Ref,
    high: Ref,
    next: Branch,
}

/// Remaining hosts of a block being expanded, as inclusive paths.
#[derive(Debug)]
struct Expansion {
    family: Family,
    next: u128,
    last: u128,
    value: i32,
}

/// Forward-only cursor over the matching blocks of one or more diagrams.
///
/// ```
/// use ipset_rs::address::{Family, Network};
/// use ipset_rs::diagram::Diagram;
/// use ipset_rs::iter::{Cursor, Matcher};
/// use ipset_rs::store::NodeStore;
///
/// let store = NodeStore::new();
/// let d = Diagram::constant(Family::V4, 0);
/// let d = store.insert(d, &"10.0.0.0/30".parse().unwrap(), 1).unwrap();
///
/// let mut cursor = Cursor::networks(&store, [d], Matcher::Equal(1));
/// assert_eq!(cursor.current().unwrap().network.to_string(), "10.0.0.0/30");
/// cursor.advance();
/// assert!(cursor.is_finished());
///
/// let hosts: Vec<String> = Cursor::addresses(&store, [d], Matcher::Equal(1))
///     .map(|b| b.network.to_string())
///     .collect();
/// assert_eq!(hosts, ["10.0.0.0", "10.0.0.1", "10.0.0.2", "10.0.0.3"]);
/// ```
#[derive(Debug)]
pub struct Cursor<'a> {
    store: &'a NodeStore,
    matcher: Matcher,
    expand: bool,
    pending: VecDeque<Diagram>,
    family: Family,
    stack: Vec<Frame>,
    path: u128,
    expansion: Option<Expansion>,
    current: Option<Block>,
}

impl<'a> Cursor<'a> {
    fn new(store: &'a NodeStore, diagrams: impl IntoIterator<Item = Diagram>, matcher: Matcher, expand: bool) -> Self {
        let mut cursor = Self {
            store,
            matcher,
            expand,
            pending: diagrams.into_iter().collect(),
            family: Family::V4,
            stack: Vec::new(),
            path: 0,
            expansion: None,
            current: None,
        };
        cursor.advance();
        cursor
    }

    /// Yields maximal CIDR blocks.
    pub fn networks(store: &'a NodeStore, diagrams: impl IntoIterator<Item = Diagram>, matcher: Matcher) -> Self {
        Self::new(store, diagrams, matcher, false)
    }

    /// Yields individual addresses in increasing order.
    pub fn addresses(store: &'a NodeStore, diagrams: impl IntoIterator<Item = Diagram>, matcher: Matcher) -> Self {
        Self::new(store, diagrams, matcher, true)
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    /// The item the cursor is positioned at, `None` once finished.
    pub fn current(&self) -> Option<&Block> {
        self.current.as_ref()
    }

    /// Moves to the next item. Does nothing once finished.
    pub fn advance(&mut self) {
        self.current = if self.expand {
            self.next_address()
        } else {
            self.next_block()
        };
    }

    fn next_address(&mut self) -> Option<Block> {
        loop {
            if let Some(exp) = &mut self.expansion {
                let path = exp.next;
                let block = Block {
                    network: Network::from_path(exp.family, path, exp.family.width()),
                    value: exp.value,
                };
                if path == exp.last {
                    self.expansion = None;
                } else {
                    exp.next += 1;
                }
                return Some(block);
            }

            let block = self.next_block()?;
            self.expansion = Some(Expansion {
                family: block.network.family(),
                next: block.network.path(),
                last: block.network.last_path(),
                value: block.value,
            });
        }
    }

    /// Pushes `r` reached at `depth`, or reports the terminal value.
    fn enter(&mut self, r: Ref, depth: u32) -> Option<i32> {
        match r {
            Ref::Terminal(value) => Some(value),
            Ref::Node(id) => {
                let node = self.store.node(id);
                let (low, high) = if node.variable == depth {
                    (node.low, node.high)
                } else {
                    (r, r)
                };
                self.stack.push(Frame {
                    depth,
                    low,
                    high,
                    next: Branch::Low,
                });
                None
            }
        }
    }

    fn emit(&self, value: i32, depth: u32) -> Option<Block> {
        if self.matcher.matches(value) {
            let network = Network::from_path(self.family, self.path, depth);
            trace!("emit {} = {}", network, value);
            Some(Block { network, value })
        } else {
            None
        }
    }

    fn next_block(&mut self) -> Option<Block> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                let diagram = self.pending.pop_front()?;
                self.family = diagram.family();
                self.path = 0;
                if let Some(value) = self.enter(diagram.root(), 0) {
                    if let Some(block) = self.emit(value, 0) {
                        return Some(block);
                    }
                }
                continue;
            };

            let depth = frame.depth;
            let mask = self.family.bit_mask(depth);
            let child = match frame.next {
                Branch::Low => {
                    frame.next = Branch::High;
                    self.path &= !mask;
                    frame.low
                }
                Branch::High => {
                    frame.next = Branch::Done;
                    self.path |= mask;
                    frame.high
                }
                Branch::Done => {
                    self.stack.pop();
                    continue;
                }
            };

            if let Some(value) = self.enter(child, depth + 1) {
                if let Some(block) = self.emit(value, depth + 1) {
                    return Some(block);
                }
            }
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.current?;
        self.advance();
        Some(block)
    }
}
