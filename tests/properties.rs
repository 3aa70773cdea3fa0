//! Property tests: canonicity, insertion semantics, persistence and block export.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipset_rs::address::Network;
use ipset_rs::map::IpMap;
use ipset_rs::set::IpSet;
use ipset_rs::store::NodeStore;
use num_bigint::BigUint;
use proptest::prelude::*;

fn v4_network(bits: u32, prefix: u32) -> Network {
    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    Network::new(IpAddr::V4(Ipv4Addr::from(bits & mask)), prefix).unwrap()
}

fn bits_of(net: &Network) -> u32 {
    match net.addr() {
        IpAddr::V4(v4) => u32::from(v4),
        IpAddr::V6(_) => unreachable!("only IPv4 networks are generated"),
    }
}

fn v4_networks() -> impl Strategy<Value = Vec<Network>> {
    // Mostly long prefixes inside 10.0.0.0/16, so networks overlap often.
    let near = (0u32..1 << 16, 16u32..=32).prop_map(|(low, prefix)| v4_network(0x0A00_0000 | low, prefix));
    let anywhere = (any::<u32>(), 0u32..=32).prop_map(|(bits, prefix)| v4_network(bits, prefix));
    prop::collection::vec(prop_oneof![4 => near, 1 => anywhere], 0..12)
}

fn v6_network(bits: u128, prefix: u32) -> Network {
    let mask = if prefix == 0 { 0 } else { u128::MAX << (128 - prefix) };
    Network::new(IpAddr::V6(Ipv6Addr::from(bits & mask)), prefix).unwrap()
}

fn mixed_networks() -> impl Strategy<Value = Vec<Network>> {
    // IPv6 networks cluster inside 2001:db8::/32.
    let v4 = (any::<u32>(), 0u32..=32).prop_map(|(bits, prefix)| v4_network(bits, prefix));
    let near = (any::<u128>(), 32u32..=128)
        .prop_map(|(low, prefix)| v6_network((0x2001_0db8u128 << 96) | (low >> 32), prefix));
    let anywhere = (any::<u128>(), 0u32..=128).prop_map(|(bits, prefix)| v6_network(bits, prefix));
    prop::collection::vec(prop_oneof![2 => v4, 3 => near, 1 => anywhere], 0..12)
}

/// The address of `net` whose host bits are taken from `offset`.
fn some_address(net: &Network, offset: u128) -> IpAddr {
    let host_bits = net.family().width() - net.prefix();
    let host = if host_bits == 0 { 0 } else { offset >> (128 - host_bits) };
    match net.addr() {
        IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4) | host as u32)),
        IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6) | host)),
    }
}

fn build<'s>(store: &'s NodeStore, nets: &[Network]) -> IpSet<'s> {
    let mut set = IpSet::new(store);
    for net in nets {
        set.add_network(net.addr(), net.prefix()).unwrap();
    }
    set
}

proptest! {
    #[test]
    fn insertion_order_does_not_matter(nets in v4_networks()) {
        let store = NodeStore::new();
        let forward = build(&store, &nets);
        let mut reversed = nets.clone();
        reversed.reverse();
        let backward = build(&store, &reversed);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn insert_matches_network_membership(nets in v4_networks(), probes in prop::collection::vec(any::<u32>(), 16)) {
        let store = NodeStore::new();
        let set = build(&store, &nets);
        let first = nets.first().map(bits_of).unwrap_or(0);
        for probe in probes.into_iter().chain([first, 0x0A00_0000]) {
            let addr = IpAddr::V4(Ipv4Addr::from(probe));
            let expected = nets.iter().any(|n| n.contains(&addr));
            prop_assert_eq!(set.contains(&addr), expected, "probe {}", addr);
        }
    }

    #[test]
    fn adding_twice_is_idempotent(nets in v4_networks()) {
        let store = NodeStore::new();
        let mut set = build(&store, &nets);
        let before = set.clone();
        for net in &nets {
            prop_assert!(!set.add_network(net.addr(), net.prefix()).unwrap());
        }
        prop_assert_eq!(set, before);
    }

    #[test]
    fn save_load_round_trip(nets in v4_networks()) {
        let store = NodeStore::new();
        let set = build(&store, &nets);
        let mut buf = Vec::new();
        set.save(&mut buf).unwrap();

        let loaded = IpSet::load(&store, buf.as_slice()).unwrap();
        prop_assert_eq!(loaded.memory_size(), set.memory_size());
        prop_assert_eq!(loaded, set);
    }

    #[test]
    fn blocks_are_minimal_and_cover_exactly(nets in v4_networks()) {
        let store = NodeStore::new();
        let set = build(&store, &nets);
        let blocks = set.networks();

        // Coverage: rebuilding from the blocks yields the same set.
        prop_assert_eq!(build(&store, &blocks), set.clone());

        // Disjoint and increasing.
        for pair in blocks.windows(2) {
            prop_assert!(pair[0].last() < pair[1].first(), "{} overlaps {}", pair[0], pair[1]);
        }

        // The sizes add up.
        let total: BigUint = blocks.iter().map(|n| BigUint::from(1u32) << (32 - n.prefix())).sum();
        prop_assert_eq!(total, set.num_addresses());

        // Maximality: the sibling half of every block is not fully in the set.
        for block in &blocks {
            if block.prefix() == 0 {
                continue;
            }
            let sibling = v4_network(bits_of(block) ^ (1 << (32 - block.prefix())), block.prefix());
            let sibling_set = build(&store, &[sibling]);
            prop_assert_ne!(set.intersection(&sibling_set).unwrap(), sibling_set, "{} could merge", block);
        }
    }

    #[test]
    fn map_last_write_wins(
        writes in prop::collection::vec((any::<u32>(), 0u32..=32, -3i32..3), 0..10),
        probes in prop::collection::vec(any::<u32>(), 16),
    ) {
        let store = NodeStore::new();
        let mut map = IpMap::new(&store, -1);
        let nets: Vec<(Network, i32)> = writes.iter().map(|&(b, p, v)| (v4_network(b, p), v)).collect();
        for (net, value) in &nets {
            map.set_network(net.addr(), net.prefix(), *value).unwrap();
        }
        let touched = nets.iter().map(|(n, _)| bits_of(n));
        for probe in probes.into_iter().chain(touched) {
            let addr = IpAddr::V4(Ipv4Addr::from(probe));
            let expected = nets.iter().rev().find(|(n, _)| n.contains(&addr)).map(|&(_, v)| v).unwrap_or(-1);
            prop_assert_eq!(map.get(&addr), expected);
        }
    }

    #[test]
    fn save_load_into_fresh_store(nets in mixed_networks()) {
        let store = NodeStore::new();
        let set = build(&store, &nets);
        let mut buf = Vec::new();
        set.save(&mut buf).unwrap();

        let fresh = NodeStore::new();
        let loaded = IpSet::load(&fresh, buf.as_slice()).unwrap();
        prop_assert_eq!(loaded.networks(), set.networks());
        prop_assert_eq!(loaded.memory_size(), set.memory_size());
        prop_assert_eq!(loaded.num_addresses(), set.num_addresses());

        // The loaded diagram is the canonical one for these networks.
        prop_assert_eq!(&loaded, &build(&fresh, &nets));
    }

    #[test]
    fn ipv6_membership_and_blocks(nets in mixed_networks(), offsets in prop::collection::vec(any::<u128>(), 4)) {
        let store = NodeStore::new();
        let set = build(&store, &nets);
        for net in &nets {
            for &offset in &offsets {
                prop_assert!(set.contains(&some_address(net, offset)), "{} within {}", offset, net);
            }
        }
        let total: BigUint = set
            .networks()
            .iter()
            .map(|n| BigUint::from(1u32) << (n.family().width() - n.prefix()))
            .sum();
        prop_assert_eq!(total, set.num_addresses());
        prop_assert_eq!(build(&store, &set.networks()), set);
    }

    #[test]
    fn map_save_load_into_fresh_store(
        default in -2i32..2,
        writes in prop::collection::vec((prop_oneof![
            (any::<u32>(), 0u32..=32).prop_map(|(b, p)| v4_network(b, p)),
            (any::<u128>(), 0u32..=128).prop_map(|(b, p)| v6_network(b, p)),
        ], -3i32..3), 0..10),
        offsets in prop::collection::vec(any::<u128>(), 4),
    ) {
        let store = NodeStore::new();
        let mut map = IpMap::new(&store, default);
        for (net, value) in &writes {
            map.set_network(net.addr(), net.prefix(), *value).unwrap();
        }
        let mut buf = Vec::new();
        map.save(&mut buf).unwrap();

        let fresh = NodeStore::new();
        let loaded = IpMap::load(&fresh, buf.as_slice()).unwrap();
        prop_assert_eq!(loaded.default_value(), default);
        prop_assert_eq!(loaded.entries(), map.entries());
        prop_assert_eq!(loaded.memory_size(), map.memory_size());

        // Pointwise: every probed address keeps its value.
        for (net, _) in &writes {
            for &offset in &offsets {
                let addr = some_address(net, offset);
                prop_assert_eq!(loaded.get(&addr), map.get(&addr), "at {}", addr);
            }
        }
        let zero = [IpAddr::V4(Ipv4Addr::UNSPECIFIED), IpAddr::V6(Ipv6Addr::UNSPECIFIED)];
        for addr in zero {
            prop_assert_eq!(loaded.get(&addr), map.get(&addr));
        }
    }
}
