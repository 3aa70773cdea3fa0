//! Diagram algorithms: evaluation, network insertion, set algebra, counting.
//!
//! # Insertion
//!
//! Assigning `value` to every address whose first `depth` bits equal those of
//! a network rebuilds only the path from variable 0 down to `depth`:
//!
//! ```text
//! for var in 0..depth:      follow the network's bit, remember the sibling cofactor
//! result = terminal(value)  stands for the whole don't-care subtree
//! for var in depth-1..=0:   result = make_node(var, result/sibling in bit order)
//! ```
//!
//! That is `O(depth)` calls to `make_node` regardless of how many addresses
//! the network covers. The old root is untouched and remains valid.
//!
//! Because canonical elision may skip variables, the cofactor of a vertex with
//! respect to a variable it does not test is the vertex itself.

use std::cmp::min;
use std::collections::HashMap;
use std::net::IpAddr;

use log::{debug, trace};
use num_bigint::BigUint;

use crate::address::{bit, path_of, Family, Network};
use crate::error::{Error, Result};
use crate::iter::Matcher;
use crate::reference::Ref;
use crate::store::{NodeStore, Nodes, OpKey};

/// A root together with the address family its variables range over.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Diagram {
    family: Family,
    root: Ref,
}

impl Diagram {
    pub(crate) const fn new(family: Family, root: Ref) -> Self {
        Self { family, root }
    }

    /// The diagram mapping every address to `value`.
    pub const fn constant(family: Family, value: i32) -> Self {
        Self::new(family, Ref::Terminal(value))
    }

    pub const fn family(&self) -> Family {
        self.family
    }

    pub const fn root(&self) -> Ref {
        self.root
    }

    fn check_family(&self, family: Family) -> Result<()> {
        if self.family == family {
            Ok(())
        } else {
            Err(Error::invalid(format!(
                "address family mismatch: {} diagram, {} operand",
                self.family, family
            )))
        }
    }
}

/// Boolean operations on set diagrams.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SetOp {
    Union,
    Intersection,
    Difference,
}

impl SetOp {
    fn eval(self, lhs: i32, rhs: i32) -> i32 {
        let (lhs, rhs) = (lhs != 0, rhs != 0);
        let res = match self {
            SetOp::Union => lhs || rhs,
            SetOp::Intersection => lhs && rhs,
            SetOp::Difference => lhs && !rhs,
        };
        res as i32
    }

    fn key(self, lhs: Ref, rhs: Ref) -> OpKey {
        match self {
            SetOp::Union => OpKey::Union(lhs.min(rhs), lhs.max(rhs)),
            SetOp::Intersection => OpKey::Intersection(lhs.min(rhs), lhs.max(rhs)),
            SetOp::Difference => OpKey::Difference(lhs, rhs),
        }
    }

    /// Results that need no recursion.
    fn shortcut(self, lhs: Ref, rhs: Ref) -> Option<Ref> {
        if let (Ref::Terminal(a), Ref::Terminal(b)) = (lhs, rhs) {
            return Some(Ref::Terminal(self.eval(a, b)));
        }
        match self {
            SetOp::Union => {
                if lhs == rhs || rhs == Ref::FALSE || lhs == Ref::TRUE {
                    Some(lhs)
                } else if lhs == Ref::FALSE || rhs == Ref::TRUE {
                    Some(rhs)
                } else {
                    None
                }
            }
            SetOp::Intersection => {
                if lhs == rhs || rhs == Ref::TRUE || lhs == Ref::FALSE {
                    Some(lhs)
                } else if lhs == Ref::TRUE || rhs == Ref::FALSE {
                    Some(rhs)
                } else {
                    None
                }
            }
            SetOp::Difference => {
                if lhs == rhs || lhs == Ref::FALSE || rhs == Ref::TRUE {
                    Some(Ref::FALSE)
                } else if rhs == Ref::FALSE {
                    Some(lhs)
                } else {
                    None
                }
            }
        }
    }
}

impl Nodes {
    /// Cofactors of `r` with respect to `variable`.
    fn cofactors(&self, r: Ref, variable: u32) -> (Ref, Ref) {
        match r {
            Ref::Node(id) => {
                let node = self.node(id);
                if node.variable == variable {
                    (node.low, node.high)
                } else {
                    (r, r)
                }
            }
            Ref::Terminal(_) => (r, r),
        }
    }

    pub(crate) fn evaluate(&self, root: Ref, family: Family, path: u128) -> i32 {
        let mut current = root;
        loop {
            match current {
                Ref::Terminal(value) => return value,
                Ref::Node(id) => {
                    let node = self.node(id);
                    let b = bit(family, path, node.variable);
                    trace!("[{:3}] {} x{} = {}", node.variable, id, node.variable, b as u8);
                    current = node.child(b);
                }
            }
        }
    }

    pub(crate) fn insert(&mut self, root: Ref, family: Family, path: u128, depth: u32, value: i32) -> Ref {
        debug_assert!(depth <= family.width());
        debug!("insert(root = {}, depth = {}, value = {})", root, depth, value);

        let mut siblings = Vec::with_capacity(depth as usize);
        let mut current = root;
        for variable in 0..depth {
            let (low, high) = self.cofactors(current, variable);
            if bit(family, path, variable) {
                siblings.push(low);
                current = high;
            } else {
                siblings.push(high);
                current = low;
            }
        }

        let mut result = Ref::Terminal(value);
        for (variable, &sibling) in siblings.iter().enumerate().rev() {
            let variable = variable as u32;
            result = if bit(family, path, variable) {
                self.make_node(variable, sibling, result)
            } else {
                self.make_node(variable, result, sibling)
            };
        }
        result
    }

    pub(crate) fn apply(&mut self, op: SetOp, lhs: Ref, rhs: Ref) -> Ref {
        if let Some(res) = op.shortcut(lhs, rhs) {
            return res;
        }

        let key = op.key(lhs, rhs);
        if let Some(res) = self.ops.get(&key) {
            trace!("cache: {:?} -> {}", key, res);
            return res;
        }

        let variable = min(self.level(lhs, u32::MAX), self.level(rhs, u32::MAX));
        let (l0, l1) = self.cofactors(lhs, variable);
        let (r0, r1) = self.cofactors(rhs, variable);
        let low = self.apply(op, l0, r0);
        let high = self.apply(op, l1, r1);
        let res = self.make_node(variable, low, high);

        debug!("computed: {:?} -> {}", key, res);
        self.ops.insert(key, res);
        res
    }

    /// Number of addresses whose value satisfies `matcher`.
    pub(crate) fn count(&self, root: Ref, family: Family, matcher: &Matcher) -> BigUint {
        let width = family.width();
        let mut cache = HashMap::new();
        self.count_below(root, width, matcher, &mut cache) << self.level(root, width)
    }

    /// Counts assignments to the bits from `level(r)` up to the width.
    fn count_below(&self, r: Ref, width: u32, matcher: &Matcher, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        let id = match r {
            Ref::Terminal(value) => {
                return if matcher.matches(value) {
                    BigUint::from(1u32)
                } else {
                    BigUint::default()
                };
            }
            Ref::Node(id) => id,
        };
        if let Some(count) = cache.get(&r) {
            return count.clone();
        }

        let node = self.node(id);
        let low = self.count_below(node.low, width, matcher, cache) << (self.level(node.low, width) - node.variable - 1);
        let high = self.count_below(node.high, width, matcher, cache) << (self.level(node.high, width) - node.variable - 1);
        let count = low + high;

        cache.insert(r, count.clone());
        count
    }
}

impl NodeStore {
    /// Value assigned to `addr`.
    pub fn evaluate(&self, diagram: Diagram, addr: &IpAddr) -> Result<i32> {
        diagram.check_family(Family::of(addr))?;
        Ok(self.lock().evaluate(diagram.root, diagram.family, path_of(addr)))
    }

    /// Assigns `value` to every address in `network`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ipset_rs::address::{Family, Network};
    /// use ipset_rs::diagram::Diagram;
    /// use ipset_rs::store::NodeStore;
    ///
    /// let store = NodeStore::new();
    /// let empty = Diagram::constant(Family::V4, 0);
    /// let net: Network = "10.0.0.0/8".parse().unwrap();
    /// let d = store.insert(empty, &net, 1).unwrap();
    ///
    /// assert_eq!(store.evaluate(d, &"10.1.2.3".parse().unwrap()).unwrap(), 1);
    /// assert_eq!(store.evaluate(d, &"11.0.0.0".parse().unwrap()).unwrap(), 0);
    /// // 8 nodes on the path plus two terminals.
    /// assert_eq!(store.reachable_size([d.root()]), 10);
    /// ```
    pub fn insert(&self, diagram: Diagram, network: &Network, value: i32) -> Result<Diagram> {
        diagram.check_family(network.family())?;
        let root = self
            .lock()
            .insert(diagram.root, diagram.family, network.path(), network.prefix(), value);
        Ok(Diagram::new(diagram.family, root))
    }

    /// Combines two boolean diagrams of the same family.
    pub fn apply(&self, op: SetOp, lhs: Diagram, rhs: Diagram) -> Result<Diagram> {
        lhs.check_family(rhs.family)?;
        let root = self.lock().apply(op, lhs.root, rhs.root);
        Ok(Diagram::new(lhs.family, root))
    }

    /// Number of addresses whose value satisfies `matcher`.
    pub fn count(&self, diagram: Diagram, matcher: &Matcher) -> BigUint {
        self.lock().count(diagram.root, diagram.family, matcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn net(s: &str) -> Network {
        s.parse().unwrap()
    }

    #[test]
    fn test_insert_host() {
        let store = NodeStore::new();
        let empty = Diagram::constant(Family::V4, 0);
        let d = store.insert(empty, &net("1.2.3.4"), 1).unwrap();

        assert_eq!(store.evaluate(d, &ip("1.2.3.4")).unwrap(), 1);
        assert_eq!(store.evaluate(d, &ip("1.2.3.5")).unwrap(), 0);
        assert_eq!(store.reachable_nodes([d.root()]), 32);
        // Old root untouched.
        assert_eq!(store.evaluate(empty, &ip("1.2.3.4")).unwrap(), 0);
    }

    #[test]
    fn test_insert_network() {
        let store = NodeStore::new();
        let d = Diagram::constant(Family::V4, 0);
        let d = store.insert(d, &net("10.0.0.0/8"), 1).unwrap();

        assert_eq!(store.evaluate(d, &ip("10.0.0.0")).unwrap(), 1);
        assert_eq!(store.evaluate(d, &ip("10.255.255.255")).unwrap(), 1);
        assert_eq!(store.evaluate(d, &ip("9.255.255.255")).unwrap(), 0);
        assert_eq!(store.evaluate(d, &ip("11.0.0.0")).unwrap(), 0);
        assert_eq!(store.reachable_nodes([d.root()]), 8);
    }

    #[test]
    fn test_insert_whole_space() {
        let store = NodeStore::new();
        let d = Diagram::constant(Family::V6, 0);
        let d = store.insert(d, &net("::/0"), 7).unwrap();
        assert_eq!(d.root(), Ref::Terminal(7));
    }

    #[test]
    fn test_insert_overwrites() {
        let store = NodeStore::new();
        let d = Diagram::constant(Family::V4, 0);
        let d = store.insert(d, &net("10.0.0.0/8"), 1).unwrap();
        let d = store.insert(d, &net("10.1.0.0/16"), 2).unwrap();

        assert_eq!(store.evaluate(d, &ip("10.1.2.3")).unwrap(), 2);
        assert_eq!(store.evaluate(d, &ip("10.2.0.0")).unwrap(), 1);
        assert_eq!(store.evaluate(d, &ip("11.1.2.3")).unwrap(), 0);
    }

    #[test]
    fn test_insert_order_independent() {
        let store = NodeStore::new();
        let nets = ["10.0.0.0/8", "192.168.1.0/24", "172.16.0.0/12", "1.1.1.1"];

        let mut a = Diagram::constant(Family::V4, 0);
        for n in nets {
            a = store.insert(a, &net(n), 1).unwrap();
        }
        let mut b = Diagram::constant(Family::V4, 0);
        for n in nets.iter().rev() {
            b = store.insert(b, &net(n), 1).unwrap();
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_adjacent_halves_merge() {
        let store = NodeStore::new();
        let d = Diagram::constant(Family::V4, 0);
        let d = store.insert(d, &net("10.0.0.0/9"), 1).unwrap();
        let d = store.insert(d, &net("10.128.0.0/9"), 1).unwrap();
        let expected = store.insert(Diagram::constant(Family::V4, 0), &net("10.0.0.0/8"), 1).unwrap();
        assert_eq!(d, expected);
    }

    #[test]
    fn test_family_mismatch() {
        let store = NodeStore::new();
        let d = Diagram::constant(Family::V4, 0);
        assert!(store.insert(d, &net("::1"), 1).is_err());
        assert!(store.evaluate(d, &ip("::1")).is_err());
        let e = Diagram::constant(Family::V6, 0);
        assert!(store.apply(SetOp::Union, d, e).is_err());
    }

    #[test]
    fn test_v6_root_keeps_its_family() {
        let store = NodeStore::new();
        let d = store.insert(Diagram::constant(Family::V6, 0), &net("::1"), 1).unwrap();
        assert_eq!(d.family(), Family::V6);

        // Probing a deep v6 diagram with a v4 address is an error, not a bit-index overflow.
        let err = store.evaluate(d, &ip("0.0.0.0")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);

        let u = store.apply(SetOp::Union, d, Diagram::constant(Family::V6, 0)).unwrap();
        assert_eq!(u.family(), Family::V6);
        assert_eq!(store.evaluate(u, &ip("::1")).unwrap(), 1);
    }

    #[test]
    fn test_apply() {
        let store = NodeStore::new();
        let empty = Diagram::constant(Family::V4, 0);
        let a = store.insert(empty, &net("10.0.0.0/8"), 1).unwrap();
        let b = store.insert(empty, &net("10.1.0.0/16"), 1).unwrap();
        let c = store.insert(empty, &net("192.168.0.0/16"), 1).unwrap();

        assert_eq!(store.apply(SetOp::Union, a, b).unwrap(), a);
        assert_eq!(store.apply(SetOp::Intersection, a, b).unwrap(), b);
        assert_eq!(store.apply(SetOp::Intersection, a, c).unwrap(), empty);

        let ac = store.apply(SetOp::Union, a, c).unwrap();
        assert_eq!(store.apply(SetOp::Union, c, a).unwrap(), ac);
        assert_eq!(store.apply(SetOp::Difference, ac, c).unwrap(), a);

        let hole = store.apply(SetOp::Difference, a, b).unwrap();
        assert_eq!(store.evaluate(hole, &ip("10.1.2.3")).unwrap(), 0);
        assert_eq!(store.evaluate(hole, &ip("10.2.0.0")).unwrap(), 1);
    }

    #[test]
    fn test_count() {
        let store = NodeStore::new();
        let empty = Diagram::constant(Family::V4, 0);
        let member = Matcher::Equal(1);

        assert_eq!(store.count(empty, &member), BigUint::default());
        assert_eq!(store.count(empty, &Matcher::Equal(0)), BigUint::from(1u64 << 32));

        let d = store.insert(empty, &net("10.0.0.0/8"), 1).unwrap();
        assert_eq!(store.count(d, &member), BigUint::from(1u32 << 24));
        let d = store.insert(d, &net("192.168.1.1"), 1).unwrap();
        assert_eq!(store.count(d, &member), BigUint::from((1u32 << 24) + 1));

        let all = Diagram::constant(Family::V6, 1);
        assert_eq!(store.count(all, &member), BigUint::from(1u32) << 128);
    }
}
