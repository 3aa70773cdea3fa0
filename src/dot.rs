//! Diagram to DOT (Graphviz) conversion.
//!
//! The generated DOT output follows these conventions:
//! - **Terminals** are squares labelled with their value, at the bottom (sink rank)
//! - **Nodes** are circles labelled with the bit they test, grouped by bit
//! - **Edges**: solid lines are high (bit = 1) branches, dashed lines are low (bit = 0) branches
//! - **Roots** are rectangles at the top (source rank)
//!
//! # Examples
//!
//! ```
//! use ipset_rs::set::IpSet;
//! use ipset_rs::store::NodeStore;
//!
//! let store = NodeStore::new();
//! let mut set = IpSet::new(&store);
//! set.add_network("10.0.0.0".parse().unwrap(), 8).unwrap();
//!
//! let dot = set.to_dot().unwrap();
//! assert!(dot.starts_with("graph {"));
//! // Render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::reference::Ref;
use crate::store::NodeStore;

/// Visual settings for DOT output.
///
/// ```
/// use ipset_rs::dot::DotConfig;
/// use ipset_rs::reference::Ref;
/// use ipset_rs::store::NodeStore;
///
/// let store = NodeStore::new();
/// let x = store.make_node(0, Ref::FALSE, Ref::TRUE).unwrap();
/// let config = DotConfig {
///     node_shape: "ellipse",
///     ..DotConfig::default()
/// };
/// let dot = store.to_dot_with_config(&[x], &config).unwrap();
/// assert!(dot.contains("shape=ellipse"));
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for nonterminal nodes (default: "circle")
    pub node_shape: &'static str,
    /// Shape for terminals (default: "square")
    pub terminal_shape: &'static str,
    /// Shape for roots (default: "rect")
    pub root_shape: &'static str,
    /// Style for high edges (default: "solid")
    pub high_edge_style: &'static str,
    /// Style for low edges (default: "dashed")
    pub low_edge_style: &'static str,
    /// Whether to use HTML labels for subscripts (default: true)
    pub use_html_labels: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            terminal_shape: "square",
            root_shape: "rect",
            high_edge_style: "solid",
            low_edge_style: "dashed",
            use_html_labels: true,
        }
    }
}

fn dot_id(r: Ref) -> String {
    match r {
        Ref::Terminal(value) => format!("\"t{}\"", value),
        Ref::Node(id) => format!("\"n{}\"", id.raw()),
    }
}

impl NodeStore {
    /// Renders every vertex reachable from `roots`. Shared nodes appear once.
    pub fn to_dot(&self, roots: &[Ref]) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(roots, &DotConfig::default())
    }

    pub fn to_dot_with_config(&self, roots: &[Ref], config: &DotConfig) -> Result<String, std::fmt::Error> {
        let nodes = self.lock();
        let all = nodes.descendants(roots.iter().copied());

        let mut terminals = Vec::new();
        let mut levels = BTreeMap::<u32, Vec<Ref>>::new();
        for &r in all.iter() {
            match r {
                Ref::Terminal(value) => terminals.push(value),
                Ref::Node(id) => levels.entry(nodes.node(id).variable).or_default().push(r),
            }
        }
        terminals.sort_unstable();
        for level in levels.values_mut() {
            level.sort_unstable();
        }

        let mut dot = String::new();
        writeln!(dot, "graph {{")?;
        writeln!(dot, "node [shape={}, fixedsize=true];", config.node_shape)?;

        writeln!(dot, "{{ rank=sink")?;
        for value in terminals {
            writeln!(
                dot,
                "{} [shape={}, label=\"{}\"];",
                dot_id(Ref::Terminal(value)),
                config.terminal_shape,
                value
            )?;
        }
        writeln!(dot, "}}")?;

        for (variable, level) in levels.iter() {
            writeln!(dot, "{{ rank=same")?;
            for &r in level {
                let label = if config.use_html_labels {
                    format!("<x<SUB>{}</SUB>>", variable)
                } else {
                    format!("\"x{}\"", variable)
                };
                writeln!(dot, "{} [label={}];", dot_id(r), label)?;
            }
            writeln!(dot, "}}")?;
        }

        for level in levels.values() {
            for &r in level {
                let Ref::Node(id) = r else { continue };
                let node = nodes.node(id);
                writeln!(dot, "{} -- {} [style={}];", dot_id(r), dot_id(node.high), config.high_edge_style)?;
                writeln!(dot, "{} -- {} [style={}];", dot_id(r), dot_id(node.low), config.low_edge_style)?;
            }
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} [shape={}, label=\"{}\"];", i, config.root_shape, root)?;
        }
        writeln!(dot, "}}")?;
        for (i, &root) in roots.iter().enumerate() {
            writeln!(dot, "r{} -- {};", i, dot_id(root))?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_dot_basic() {
        let store = NodeStore::new();
        let x1 = store.make_node(1, Ref::FALSE, Ref::TRUE).unwrap();
        let f = store.make_node(0, Ref::FALSE, x1).unwrap();

        let dot = store.to_dot(&[f]).unwrap();
        assert!(dot.starts_with("graph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("\"t0\" [shape=square, label=\"0\"];"));
        assert!(dot.contains("<x<SUB>1</SUB>>"));
        assert!(dot.contains("\"n0\" -- \"t1\" [style=solid];"));
        assert!(dot.contains("\"n0\" -- \"t0\" [style=dashed];"));
    }

    #[test]
    fn test_to_dot_constants() {
        let store = NodeStore::new();
        let dot = store.to_dot(&[Ref::Terminal(-1), Ref::TRUE]).unwrap();
        assert!(dot.contains("\"t-1\" [shape=square, label=\"-1\"];"));
        assert!(dot.contains("r0 -- \"t-1\";"));
        assert!(dot.contains("r1 -- \"t1\";"));
    }

    #[test]
    fn test_to_dot_plain_labels() {
        let store = NodeStore::new();
        let x = store.make_node(3, Ref::FALSE, Ref::TRUE).unwrap();
        let config = DotConfig {
            use_html_labels: false,
            ..DotConfig::default()
        };
        let dot = store.to_dot_with_config(&[x], &config).unwrap();
        assert!(dot.contains("[label=\"x3\"]"));
    }
}
