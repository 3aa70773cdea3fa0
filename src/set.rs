//! Sets of IP addresses.

use std::fmt::{Debug, Formatter};
use std::io::{Read, Write};
use std::net::IpAddr;
use std::ptr;

use num_bigint::BigUint;

use crate::address::{Family, Network};
use crate::diagram::{Diagram, SetOp};
use crate::error::{Error, Result};
use crate::io::{self, Kind};
use crate::iter::{Cursor, Matcher};
use crate::reference::Ref;
use crate::store::NodeStore;

/// A set of IPv4 and IPv6 addresses, stored as one boolean diagram per family.
///
/// Adding or removing a network costs `O(prefix)` node operations no matter
/// how many addresses it covers. Two sets built in the same store are equal
/// exactly when their roots are equal.
///
/// ```
/// use ipset_rs::address::Network;
/// use ipset_rs::set::IpSet;
/// use ipset_rs::store::NodeStore;
///
/// let store = NodeStore::new();
/// let mut set = IpSet::new(&store);
/// set.add_network("10.0.0.0".parse().unwrap(), 8).unwrap();
///
/// assert!(set.contains(&"10.1.2.3".parse().unwrap()));
/// assert!(!set.contains(&"11.0.0.0".parse().unwrap()));
/// assert_eq!(set.networks(), ["10.0.0.0/8".parse::<Network>().unwrap()]);
/// ```
#[derive(Clone)]
pub struct IpSet<'s> {
    store: &'s NodeStore,
    roots: [Ref; 2],
}

impl<'s> IpSet<'s> {
    /// Creates an empty set.
    pub fn new(store: &'s NodeStore) -> Self {
        Self {
            store,
            roots: [Ref::FALSE; 2],
        }
    }

    pub fn store(&self) -> &'s NodeStore {
        self.store
    }

    fn diagram(&self, family: Family) -> Diagram {
        Diagram::new(family, self.roots[family.index()])
    }

    fn diagrams(&self) -> [Diagram; 2] {
        Family::ALL.map(|f| self.diagram(f))
    }

    fn assign(&mut self, network: &Network, member: bool) -> Result<bool> {
        let family = network.family();
        let old = self.diagram(family);
        let new = self.store.insert(old, network, member as i32)?;
        self.roots[family.index()] = new.root();
        Ok(new != old)
    }

    /// Sets the membership of an already validated network.
    pub(crate) fn add_parsed(&mut self, network: &Network, member: bool) -> bool {
        let changed = self.assign(network, member);
        // A network always matches the diagram of its own family.
        debug_assert!(changed.is_ok(), "{}: {:?}", network, changed);
        changed.unwrap_or(false)
    }

    /// Adds one address. Returns whether the set changed.
    pub fn add(&mut self, addr: IpAddr) -> bool {
        self.add_parsed(&Network::host(addr), true)
    }

    /// Adds every address of `addr/prefix`. Returns whether the set changed.
    ///
    /// Fails with [`Error::InvalidArgument`] and leaves the set unchanged if
    /// `prefix` is out of range or `addr` has host bits set.
    pub fn add_network(&mut self, addr: IpAddr, prefix: u32) -> Result<bool> {
        let network = Network::new(addr, prefix)?;
        self.assign(&network, true)
    }

    /// Removes one address. Returns whether the set changed.
    pub fn remove(&mut self, addr: IpAddr) -> bool {
        self.add_parsed(&Network::host(addr), false)
    }

    /// Removes every address of `addr/prefix`. Returns whether the set changed.
    pub fn remove_network(&mut self, addr: IpAddr, prefix: u32) -> Result<bool> {
        let network = Network::new(addr, prefix)?;
        self.assign(&network, false)
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        let family = Family::of(addr);
        self.store
            .evaluate(self.diagram(family), addr)
            .map(|v| v != 0)
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.roots == [Ref::FALSE; 2]
    }

    /// Whether both sets hold exactly the same addresses.
    ///
    /// Sets from different stores are never equal.
    pub fn is_equal(&self, other: &IpSet<'_>) -> bool {
        ptr::eq(self.store, other.store) && self.roots == other.roots
    }

    /// Distinct diagram vertices (terminals included) of both families.
    pub fn reachable_size(&self) -> usize {
        self.store.reachable_size(self.roots)
    }

    /// Bytes used by the nonterminals of this set.
    pub fn memory_size(&self) -> usize {
        self.store.memory_size(self.roots)
    }

    /// Number of addresses in the set.
    pub fn num_addresses(&self) -> BigUint {
        let matcher = Matcher::Equal(1);
        self.diagrams()
            .into_iter()
            .map(|d| self.store.count(d, &matcher))
            .sum()
    }

    /// Iterates over the addresses whose membership equals `desired`, in
    /// increasing order, IPv4 first.
    pub fn iter(&self, desired: bool) -> Cursor<'s> {
        Cursor::addresses(self.store, self.diagrams(), Matcher::Equal(desired as i32))
    }

    /// Iterates over the maximal CIDR blocks whose membership equals `desired`.
    pub fn iter_networks(&self, desired: bool) -> Cursor<'s> {
        Cursor::networks(self.store, self.diagrams(), Matcher::Equal(desired as i32))
    }

    /// Maximal CIDR blocks covering the set.
    pub fn networks(&self) -> Vec<Network> {
        self.iter_networks(true).map(|b| b.network).collect()
    }

    fn combine(&self, op: SetOp, other: &IpSet<'_>) -> Result<IpSet<'s>> {
        if !ptr::eq(self.store, other.store) {
            return Err(Error::invalid("sets belong to different node stores"));
        }
        let mut roots = [Ref::FALSE; 2];
        for family in Family::ALL {
            let d = self.store.apply(op, self.diagram(family), other.diagram(family))?;
            roots[family.index()] = d.root();
        }
        Ok(IpSet {
            store: self.store,
            roots,
        })
    }

    pub fn union(&self, other: &IpSet<'_>) -> Result<IpSet<'s>> {
        self.combine(SetOp::Union, other)
    }

    pub fn intersection(&self, other: &IpSet<'_>) -> Result<IpSet<'s>> {
        self.combine(SetOp::Intersection, other)
    }

    /// Addresses in `self` but not in `other`.
    pub fn difference(&self, other: &IpSet<'_>) -> Result<IpSet<'s>> {
        self.combine(SetOp::Difference, other)
    }

    /// Writes the set in the binary file format.
    pub fn save<W: Write>(&self, w: W) -> Result<()> {
        io::save(self.store, Kind::Set, 0, self.diagrams(), w)
    }

    /// Reads a set file into `store`.
    pub fn load<R: Read>(store: &'s NodeStore, r: R) -> Result<Self> {
        let (_, diagrams) = io::load(store, Kind::Set, r)?;
        Ok(Self {
            store,
            roots: diagrams.map(|d| d.root()),
        })
    }

    /// GraphViz rendering of both family diagrams.
    pub fn to_dot(&self) -> std::result::Result<String, std::fmt::Error> {
        self.store.to_dot(&self.roots)
    }
}

impl PartialEq for IpSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl Eq for IpSet<'_> {}

impl Debug for IpSet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter_networks(true).map(|b| b.network)).finish()
    }
}

impl Extend<Network> for IpSet<'_> {
    fn extend<T: IntoIterator<Item = Network>>(&mut self, iter: T) {
        for network in iter {
            self.add_parsed(&network, true);
        }
    }
}
