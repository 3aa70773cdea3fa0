//! # ipset-rs: IP address sets and maps as decision diagrams
//!
//! **`ipset-rs`** stores sets of IPv4/IPv6 addresses, and maps from addresses
//! to `i32` values, as reduced ordered binary decision diagrams. Each address
//! bit is one diagram variable, most significant bit first.
//!
//! ## Why a diagram?
//!
//! - **Networks are cheap**: adding `10.0.0.0/8` touches 8 nodes, not 2^24 leaves.
//! - **Canonical**: every diagram lives in a hash-consed [`NodeStore`][crate::store::NodeStore],
//!   so two sets are equal iff their roots are equal, and emptiness is a single comparison.
//! - **Compact export**: walking the diagram yields the minimal list of CIDR blocks.
//! - **Persistent**: updates build new roots and never modify existing nodes,
//!   so readers of an old root are unaffected by writers.
//!
//! ## Basic Usage
//!
//! ```rust
//! use ipset_rs::address::Network;
//! use ipset_rs::set::IpSet;
//! use ipset_rs::store::NodeStore;
//!
//! let store = NodeStore::new();
//! let mut set = IpSet::new(&store);
//!
//! set.add("192.168.1.5".parse().unwrap());
//! set.add_network("192.168.1.0".parse().unwrap(), 24).unwrap();
//! assert!(set.contains(&"192.168.1.77".parse().unwrap()));
//!
//! // The single address was absorbed by the network.
//! let blocks: Vec<Network> = set.networks();
//! assert_eq!(blocks, ["192.168.1.0/24".parse::<Network>().unwrap()]);
//!
//! // Save and load round-trip to an equal set.
//! let mut buf = Vec::new();
//! set.save(&mut buf).unwrap();
//! let loaded = IpSet::load(&store, buf.as_slice()).unwrap();
//! assert_eq!(loaded, set);
//! ```
//!
//! ## Core Components
//!
//! - **[`store`]**: The node store. Hash-consing, computed table, size queries.
//! - **[`diagram`]**: Evaluation, network insertion, set algebra and address counting.
//! - **[`address`]**: Address families and CIDR [`Network`][crate::address::Network]s.
//! - **[`set`]** and **[`map`]**: The user-facing containers.
//! - **[`iter`]**: Lazy cursors over matching addresses or CIDR blocks.
//! - **[`io`]**: The binary file format.
//! - **[`text`]**: Line-oriented text input with deferred removals.
//! - **[`dot`]**: Graphviz export.

pub mod address;
pub mod cache;
pub mod diagram;
pub mod dot;
pub mod error;
pub mod io;
pub mod iter;
pub mod map;
pub mod node;
pub mod reference;
pub mod set;
pub mod store;
pub mod subtable;
pub mod text;
