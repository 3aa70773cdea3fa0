//! Conversion between IP addresses and diagram bit paths.
//!
//! An address of family `F` is a path of `F::width()` bits, most significant
//! bit first: variable 0 is the top bit of the first octet. Internally a path
//! is kept right-aligned in a `u128`, so an IPv4 path is simply
//! `u32::from(addr) as u128`.

use std::fmt::{Debug, Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Address family. Each family has its own, fully separate diagram.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub const ALL: [Family; 2] = [Family::V4, Family::V6];

    /// Number of address bits (and of diagram variables).
    pub const fn width(self) -> u32 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Family::V4 => 0,
            Family::V6 => 1,
        }
    }

    /// Mask selecting path bit `variable`.
    pub(crate) const fn bit_mask(self, variable: u32) -> u128 {
        1u128 << (self.width() - 1 - variable)
    }

    /// Mask keeping the first `depth` bits of a path.
    pub(crate) const fn prefix_mask(self, depth: u32) -> u128 {
        let all = u128::MAX >> (128 - self.width());
        if depth == 0 {
            0
        } else if depth >= self.width() {
            all
        } else {
            all & !(all >> depth)
        }
    }

    fn to_addr(self, path: u128) -> IpAddr {
        match self {
            Family::V4 => IpAddr::V4(Ipv4Addr::from(path as u32)),
            Family::V6 => IpAddr::V6(Ipv6Addr::from(path)),
        }
    }
}

impl Display for Family {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

/// Right-aligned bit path of an address.
pub(crate) fn path_of(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(*v4) as u128,
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

/// Value of path bit `variable`.
pub(crate) fn bit(family: Family, path: u128, variable: u32) -> bool {
    path & family.bit_mask(variable) != 0
}

/// A CIDR block: an address plus a prefix length.
///
/// A network always has its host bits cleared. A prefix equal to the family
/// width denotes a single address and displays without the `/len` suffix.
///
/// ```
/// use ipset_rs::address::Network;
///
/// let net: Network = "10.0.0.0/8".parse().unwrap();
/// assert_eq!(net.prefix(), 8);
/// assert!(net.contains(&"10.1.2.3".parse().unwrap()));
/// assert_eq!(net.to_string(), "10.0.0.0/8");
///
/// let host: Network = "192.168.1.5".parse().unwrap();
/// assert_eq!(host.to_string(), "192.168.1.5");
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Network {
    addr: IpAddr,
    prefix: u8,
}

impl Network {
    /// Creates a network, rejecting a prefix longer than the address width
    /// and addresses with bits set below the prefix.
    pub fn new(addr: IpAddr, prefix: u32) -> Result<Self> {
        let family = Family::of(&addr);
        if prefix > family.width() {
            return Err(Error::invalid(format!(
                "prefix length {} out of range for {} (0..={})",
                prefix,
                family,
                family.width()
            )));
        }
        let path = path_of(&addr);
        if path & !family.prefix_mask(prefix) != 0 {
            return Err(Error::invalid(format!("{}/{} has host bits set", addr, prefix)));
        }
        Ok(Self {
            addr,
            prefix: prefix as u8,
        })
    }

    /// A single-address network (`/32` or `/128`).
    pub fn host(addr: IpAddr) -> Self {
        Self {
            addr,
            prefix: Family::of(&addr).width() as u8,
        }
    }

    /// Builds the network whose first `depth` bits are taken from `path`.
    pub(crate) fn from_path(family: Family, path: u128, depth: u32) -> Self {
        Self {
            addr: family.to_addr(path & family.prefix_mask(depth)),
            prefix: depth as u8,
        }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix(&self) -> u32 {
        self.prefix as u32
    }

    pub fn family(&self) -> Family {
        Family::of(&self.addr)
    }

    /// Whether this network is a single address.
    pub fn is_host(&self) -> bool {
        self.prefix() == self.family().width()
    }

    pub(crate) fn path(&self) -> u128 {
        path_of(&self.addr)
    }

    /// Path of the last address covered by this network.
    pub(crate) fn last_path(&self) -> u128 {
        let family = self.family();
        let all = u128::MAX >> (128 - family.width());
        self.path() | (all & !family.prefix_mask(self.prefix()))
    }

    /// First address of the block.
    pub fn first(&self) -> IpAddr {
        self.addr
    }

    /// Last address of the block.
    pub fn last(&self) -> IpAddr {
        self.family().to_addr(self.last_path())
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        let family = self.family();
        Family::of(addr) == family && path_of(addr) & family.prefix_mask(self.prefix()) == self.path()
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_host() {
            write!(f, "{}", self.addr)
        } else {
            write!(f, "{}/{}", self.addr, self.prefix)
        }
    }
}

impl Debug for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<IpAddr> for Network {
    fn from(addr: IpAddr) -> Self {
        Network::host(addr)
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (addr_str, prefix_str) = match s.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (s, None),
        };

        let addr: IpAddr = addr_str
            .parse()
            .map_err(|e| Error::parse(format!("invalid IP address {:?}: {}", addr_str, e)))?;

        match prefix_str {
            None => Ok(Network::host(addr)),
            Some("") => Err(Error::parse(format!("missing CIDR prefix in {:?}", s))),
            Some(p) => {
                let prefix: u32 = p
                    .parse()
                    .map_err(|_| Error::parse(format!("invalid CIDR prefix {:?}", p)))?;
                Network::new(addr, prefix)
            }
        }
    }
}
