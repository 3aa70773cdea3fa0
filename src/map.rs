//! Maps from IP addresses to `i32` values.

use std::fmt::{Debug, Formatter};
use std::io::{Read, Write};
use std::net::IpAddr;
use std::ptr;

use num_bigint::BigUint;

use crate::address::{Family, Network};
use crate::diagram::Diagram;
use crate::error::Result;
use crate::io::{self, Kind};
use crate::iter::{Block, Cursor, Matcher};
use crate::reference::Ref;
use crate::store::NodeStore;

/// A total map from every IPv4 and IPv6 address to an `i32`.
///
/// Addresses never assigned map to the default value given at construction.
///
/// ```
/// use ipset_rs::map::IpMap;
/// use ipset_rs::store::NodeStore;
///
/// let store = NodeStore::new();
/// let mut map = IpMap::new(&store, -1);
/// map.set_network("10.0.0.0".parse().unwrap(), 8, 1).unwrap();
/// map.set("10.0.0.1".parse().unwrap(), 2);
///
/// assert_eq!(map.get(&"10.0.0.1".parse().unwrap()), 2);
/// assert_eq!(map.get(&"10.0.0.2".parse().unwrap()), 1);
/// assert_eq!(map.get(&"192.168.0.1".parse().unwrap()), -1);
/// ```
#[derive(Clone)]
pub struct IpMap<'s> {
    store: &'s NodeStore,
    default: i32,
    roots: [Ref; 2],
}

impl<'s> IpMap<'s> {
    /// Creates a map sending every address to `default`.
    pub fn new(store: &'s NodeStore, default: i32) -> Self {
        Self {
            store,
            default,
            roots: [Ref::Terminal(default); 2],
        }
    }

    pub fn store(&self) -> &'s NodeStore {
        self.store
    }

    pub fn default_value(&self) -> i32 {
        self.default
    }

    fn diagram(&self, family: Family) -> Diagram {
        Diagram::new(family, self.roots[family.index()])
    }

    fn diagrams(&self) -> [Diagram; 2] {
        Family::ALL.map(|f| self.diagram(f))
    }

    fn assign(&mut self, network: &Network, value: i32) -> Result<()> {
        let family = network.family();
        let new = self.store.insert(self.diagram(family), network, value)?;
        self.roots[family.index()] = new.root();
        Ok(())
    }

    /// Assigns `value` to one address.
    pub fn set(&mut self, addr: IpAddr, value: i32) {
        let res = self.assign(&Network::host(addr), value);
        // A host network always matches its own family.
        debug_assert!(res.is_ok(), "{}: {:?}", addr, res);
    }

    /// Assigns `value` to every address of `addr/prefix`.
    ///
    /// Fails with [`crate::error::Error::InvalidArgument`] and leaves the map
    /// unchanged if `prefix` is out of range or `addr` has host bits set.
    pub fn set_network(&mut self, addr: IpAddr, prefix: u32, value: i32) -> Result<()> {
        let network = Network::new(addr, prefix)?;
        self.assign(&network, value)
    }

    /// Resets one address to the default value.
    pub fn remove(&mut self, addr: IpAddr) {
        self.set(addr, self.default);
    }

    /// Resets every address of `addr/prefix` to the default value.
    pub fn remove_network(&mut self, addr: IpAddr, prefix: u32) -> Result<()> {
        self.set_network(addr, prefix, self.default)
    }

    pub fn get(&self, addr: &IpAddr) -> i32 {
        self.store
            .evaluate(self.diagram(Family::of(addr)), addr)
            .unwrap_or(self.default)
    }

    /// Whether every address maps to the default value.
    pub fn is_empty(&self) -> bool {
        self.roots == [Ref::Terminal(self.default); 2]
    }

    /// Whether both maps assign the same value to every address.
    pub fn is_equal(&self, other: &IpMap<'_>) -> bool {
        ptr::eq(self.store, other.store) && self.roots == other.roots
    }

    pub fn reachable_size(&self) -> usize {
        self.store.reachable_size(self.roots)
    }

    pub fn memory_size(&self) -> usize {
        self.store.memory_size(self.roots)
    }

    /// Number of addresses whose value satisfies `matcher`.
    pub fn num_addresses(&self, matcher: Matcher) -> BigUint {
        self.diagrams()
            .into_iter()
            .map(|d| self.store.count(d, &matcher))
            .sum()
    }

    /// Iterates over the addresses whose value satisfies `matcher`.
    pub fn iter(&self, matcher: Matcher) -> Cursor<'s> {
        Cursor::addresses(self.store, self.diagrams(), matcher)
    }

    /// Iterates over the maximal CIDR blocks whose value satisfies `matcher`.
    pub fn iter_networks(&self, matcher: Matcher) -> Cursor<'s> {
        Cursor::networks(self.store, self.diagrams(), matcher)
    }

    /// Maximal blocks with a non-default value.
    pub fn entries(&self) -> Vec<Block> {
        self.iter_networks(Matcher::NotEqual(self.default)).collect()
    }

    pub fn save<W: Write>(&self, w: W) -> Result<()> {
        io::save(self.store, Kind::Map, self.default, self.diagrams(), w)
    }

    /// Reads a map file into `store`. The default value comes from the file.
    pub fn load<R: Read>(store: &'s NodeStore, r: R) -> Result<Self> {
        let (default, diagrams) = io::load(store, Kind::Map, r)?;
        Ok(Self {
            store,
            default,
            roots: diagrams.map(|d| d.root()),
        })
    }

    pub fn to_dot(&self) -> std::result::Result<String, std::fmt::Error> {
        self.store.to_dot(&self.roots)
    }
}

impl PartialEq for IpMap<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl Eq for IpMap<'_> {}

impl Debug for IpMap<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries().into_iter().map(|b| (b.network, b.value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    use test_log::test;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_default() {
        let store = NodeStore::new();
        let map = IpMap::new(&store, 7);
        assert!(map.is_empty());
        assert_eq!(map.default_value(), 7);
        assert_eq!(map.get(&ip("1.2.3.4")), 7);
        assert_eq!(map.get(&ip("::1")), 7);
        assert!(map.entries().is_empty());
        assert_eq!(map.memory_size(), 0);
    }

    #[test]
    fn test_overwrite() {
        let store = NodeStore::new();
        let mut map = IpMap::new(&store, 0);
        map.set_network(ip("10.0.0.0"), 8, 1).unwrap();
        map.set_network(ip("10.1.0.0"), 16, 2).unwrap();
        map.set(ip("10.1.0.1"), 3);

        assert_eq!(map.get(&ip("10.0.0.1")), 1);
        assert_eq!(map.get(&ip("10.1.0.0")), 2);
        assert_eq!(map.get(&ip("10.1.0.1")), 3);
        assert_eq!(map.num_addresses(Matcher::Equal(3)), BigUint::from(1u32));
        assert_eq!(map.num_addresses(Matcher::Equal(2)), BigUint::from((1u32 << 16) - 1));

        map.set_network(ip("10.0.0.0"), 8, 4).unwrap();
        assert_eq!(map.get(&ip("10.1.0.1")), 4);
        assert_eq!(
            map.entries(),
            [Block {
                network: "10.0.0.0/8".parse().unwrap(),
                value: 4
            }]
        );
    }

    #[test]
    fn test_invalid_prefix() {
        let store = NodeStore::new();
        let mut map = IpMap::new(&store, 0);
        map.set(ip("1.1.1.1"), 5);
        let before = map.clone();
        let err = map.set_network(ip("1.1.1.0"), 40, 9).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(map, before);
    }

    #[test]
    fn test_remove() {
        let store = NodeStore::new();
        let mut map = IpMap::new(&store, -1);
        map.set_network(ip("2001:db8::"), 32, 10).unwrap();
        map.remove(ip("2001:db8::5"));
        assert_eq!(map.get(&ip("2001:db8::5")), -1);
        assert_eq!(map.get(&ip("2001:db8::6")), 10);
        map.remove_network(ip("2001:db8::"), 32).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_iter_by_value() {
        let store = NodeStore::new();
        let mut map = IpMap::new(&store, 0);
        map.set_network(ip("192.168.0.0"), 31, 1).unwrap();
        map.set(ip("192.168.0.2"), 2);

        let ones: Vec<IpAddr> = map.iter(Matcher::Equal(1)).map(|b| b.network.addr()).collect();
        assert_eq!(ones, [ip("192.168.0.0"), ip("192.168.0.1")]);

        let any: Vec<(String, i32)> = map
            .iter_networks(Matcher::NotEqual(0))
            .map(|b| (b.network.to_string(), b.value))
            .collect();
        assert_eq!(any, [("192.168.0.0/31".to_string(), 1), ("192.168.0.2".to_string(), 2)]);
    }

    #[test]
    fn test_save_load() {
        let store = NodeStore::new();
        let mut map = IpMap::new(&store, -5);
        map.set_network(ip("10.0.0.0"), 8, 1).unwrap();
        map.set(ip("::1"), 2);

        let mut buf = Vec::new();
        map.save(&mut buf).unwrap();
        let loaded = IpMap::load(&store, buf.as_slice()).unwrap();
        assert_eq!(loaded, map);
        assert_eq!(loaded.default_value(), -5);

        let err = crate::set::IpSet::load(&store, buf.as_slice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
