//! Reading sets from line-oriented text.
//!
//! One address or CIDR network per line. Blank lines and `#` comments are
//! ignored. A line starting with `!` removes its address or network, but
//! removals are collected and applied only after every addition in the same
//! input, so `!10.0.0.1` punches a hole in a `10.0.0.0/8` listed later.
//! Malformed lines are reported with `warn!` and skipped.

use std::io::BufRead;

use log::{debug, warn};

use crate::address::{Family, Network};
use crate::error::Result;
use crate::set::IpSet;

/// What one text input contributed.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct TextSummary {
    /// Lines that parsed as an address or network.
    pub records: usize,
    /// Single-address records, per family.
    pub addresses: [usize; 2],
    /// Network records, per family.
    pub blocks: [usize; 2],
    /// Malformed lines.
    pub skipped: usize,
    /// Additions that did not change the set.
    pub duplicates: usize,
    /// Removals that did not change the set.
    pub missing: usize,
}

impl TextSummary {
    pub fn addresses(&self, family: Family) -> usize {
        self.addresses[family.index()]
    }

    pub fn blocks(&self, family: Family) -> usize {
        self.blocks[family.index()]
    }
}

struct Removal {
    line: usize,
    network: Network,
}

impl IpSet<'_> {
    /// Adds and removes the records read from `input`, named `name` in log output.
    ///
    /// Only stream failures are returned as errors.
    ///
    /// ```
    /// use ipset_rs::set::IpSet;
    /// use ipset_rs::store::NodeStore;
    ///
    /// let store = NodeStore::new();
    /// let mut set = IpSet::new(&store);
    /// let summary = set.read_text("!10.0.0.1\n10.0.0.0/8\n".as_bytes(), "inline").unwrap();
    ///
    /// assert_eq!(summary.records, 2);
    /// assert!(!set.contains(&"10.0.0.1".parse().unwrap()));
    /// assert!(set.contains(&"10.0.0.2".parse().unwrap()));
    /// ```
    pub fn read_text<R: BufRead>(&mut self, input: R, name: &str) -> Result<TextSummary> {
        let mut summary = TextSummary::default();
        let mut removals = Vec::new();

        for (index, line) in input.lines().enumerate() {
            let line_num = index + 1;
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (remove, text) = match line.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, line),
            };
            let network = match text.parse::<Network>() {
                Ok(network) => network,
                Err(e) => {
                    warn!("{}, line {}: skipping {}: {}", name, line_num, text, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            summary.records += 1;
            let family = network.family().index();
            if text.contains('/') {
                summary.blocks[family] += 1;
            } else {
                summary.addresses[family] += 1;
            }

            if remove {
                removals.push(Removal { line: line_num, network });
            } else if !self.add_parsed(&network, true) {
                warn!("{}, line {}: {} is a duplicate", name, line_num, network);
                summary.duplicates += 1;
            }
        }

        for removal in &removals {
            if !self.add_parsed(&removal.network, false) {
                warn!("{}, line {}: {} is not in the set", name, removal.line, removal.network);
                summary.missing += 1;
            }
        }

        debug!(
            "{}: {} records, {} removals",
            name,
            summary.records,
            removals.len()
        );
        Ok(summary)
    }
}
