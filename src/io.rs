//! Binary persistence of containers.
//!
//! All integers are big-endian.
//!
//! ```text
//! header   := "IP set" version:u16=2 kind:u8 reserved:u8=0 default:i32
//! section  := width:u8 count:u32 record{count} root:child      (IPv4, then IPv6)
//! record   := variable:u32 low:child high:child
//! child    := 0x00 value:i32 | 0x01 index:u32
//! ```
//!
//! Records are written children first, so every `index` names a record
//! that precedes the one referring to it. Shared subdiagrams are written once.
//! Loading validates the whole section before touching the store, then
//! replays the records through `make_node`.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use log::{debug, info};

use crate::address::Family;
use crate::diagram::Diagram;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::reference::{NodeId, Ref};
use crate::store::{NodeStore, Nodes};

pub const MAGIC: &[u8; 6] = b"IP set";
pub const VERSION: u16 = 2;

const TAG_TERMINAL: u8 = 0;
const TAG_NODE: u8 = 1;

/// What the terminals of a file mean.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Kind {
    /// Boolean terminals (0 or 1).
    Set,
    /// Arbitrary `i32` terminals.
    Map,
}

impl Kind {
    fn to_byte(self) -> u8 {
        match self {
            Kind::Set => 0,
            Kind::Map => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Kind::Set),
            1 => Ok(Kind::Map),
            _ => Err(Error::format(format!("unknown container kind {}", byte))),
        }
    }
}

/// Child reference as stored in a record.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Child {
    Terminal(i32),
    Record(u32),
}

#[derive(Debug, Copy, Clone)]
struct Record {
    variable: u32,
    low: Child,
    high: Child,
}

struct Reader<R> {
    inner: R,
}

impl<R: Read> Reader<R> {
    fn bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::format("unexpected end of file")
            } else {
                Error::Io(e)
            }
        })?;
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.bytes()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.bytes()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.bytes()?))
    }

    fn child(&mut self) -> Result<Child> {
        match self.u8()? {
            TAG_TERMINAL => Ok(Child::Terminal(self.i32()?)),
            TAG_NODE => Ok(Child::Record(self.u32()?)),
            tag => Err(Error::format(format!("unknown child tag {}", tag))),
        }
    }

    fn expect_eof(&mut self) -> Result<()> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(_) => return Err(Error::format("trailing bytes after last section")),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

fn write_child<W: Write>(w: &mut W, child: Child) -> Result<()> {
    match child {
        Child::Terminal(value) => {
            w.write_all(&[TAG_TERMINAL])?;
            w.write_all(&value.to_be_bytes())?;
        }
        Child::Record(index) => {
            w.write_all(&[TAG_NODE])?;
            w.write_all(&index.to_be_bytes())?;
        }
    }
    Ok(())
}

impl Nodes {
    /// Collects the nonterminals below `r` children first.
    fn post_order(&self, r: Ref, indices: &mut HashMap<NodeId, u32>, records: &mut Vec<Node>) -> Child {
        match r {
            Ref::Terminal(value) => Child::Terminal(value),
            Ref::Node(id) => {
                if let Some(&index) = indices.get(&id) {
                    return Child::Record(index);
                }
                let node = self.node(id);
                self.post_order(node.low, indices, records);
                self.post_order(node.high, indices, records);
                let index = records.len() as u32;
                records.push(node);
                indices.insert(id, index);
                Child::Record(index)
            }
        }
    }
}

impl NodeStore {
    /// Writes one diagram section.
    pub fn save_diagram<W: Write>(&self, diagram: Diagram, w: &mut W) -> Result<()> {
        let mut indices = HashMap::new();
        let mut records = Vec::new();
        let root = self.lock().post_order(diagram.root(), &mut indices, &mut records);

        debug!("save {}: {} records", diagram.family(), records.len());

        w.write_all(&[diagram.family().width() as u8])?;
        w.write_all(&(records.len() as u32).to_be_bytes())?;
        for node in &records {
            let child = |r: Ref| match r {
                Ref::Terminal(value) => Child::Terminal(value),
                Ref::Node(id) => Child::Record(indices[&id]),
            };
            w.write_all(&node.variable.to_be_bytes())?;
            write_child(w, child(node.low))?;
            write_child(w, child(node.high))?;
        }
        write_child(w, root)
    }

    /// Reads one diagram section of the given family.
    ///
    /// Nothing is added to the store unless the whole section is valid.
    pub fn load_diagram<R: Read>(&self, family: Family, kind: Kind, r: &mut R) -> Result<Diagram> {
        let mut reader = Reader { inner: r };
        let (records, root) = read_section(&mut reader, family, kind)?;

        let mut nodes = self.lock();
        nodes
            .reserve(records.len())
            .map_err(|e| Error::Allocation(format!("cannot reserve {} nodes: {}", records.len(), e)))?;

        let mut refs: Vec<Ref> = Vec::with_capacity(records.len());
        let resolve = |refs: &[Ref], child: Child| match child {
            Child::Terminal(value) => Ref::Terminal(value),
            Child::Record(index) => refs[index as usize],
        };
        for record in &records {
            let low = resolve(&refs, record.low);
            let high = resolve(&refs, record.high);
            let r = nodes.make_node(record.variable, low, high);
            refs.push(r);
        }
        let root = resolve(&refs, root);

        debug!("load {}: {} records, root {}", family, records.len(), root);
        Ok(Diagram::new(family, root))
    }
}

fn read_section<R: Read>(reader: &mut Reader<R>, family: Family, kind: Kind) -> Result<(Vec<Record>, Child)> {
    let width = reader.u8()? as u32;
    if width != family.width() {
        return Err(Error::format(format!(
            "{} section has width {}, expected {}",
            family,
            width,
            family.width()
        )));
    }

    let count = reader.u32()?;
    let mut records: Vec<Record> = Vec::new();

    let check = |records: &[Record], child: Child, parent: Option<u32>| -> Result<()> {
        match child {
            Child::Terminal(value) => {
                if kind == Kind::Set && value != 0 && value != 1 {
                    return Err(Error::format(format!("non-boolean terminal {} in a set", value)));
                }
            }
            Child::Record(index) => {
                let Some(target) = records.get(index as usize) else {
                    return Err(Error::format(format!(
                        "reference to record {} before it was defined",
                        index
                    )));
                };
                if let Some(parent) = parent {
                    if target.variable <= parent {
                        return Err(Error::format(format!(
                            "child variable {} does not follow parent variable {}",
                            target.variable, parent
                        )));
                    }
                }
            }
        }
        Ok(())
    };

    for _ in 0..count {
        let variable = reader.u32()?;
        if variable >= width {
            return Err(Error::format(format!("variable {} out of range for {}", variable, family)));
        }
        let low = reader.child()?;
        let high = reader.child()?;
        check(&records, low, Some(variable))?;
        check(&records, high, Some(variable))?;
        records.push(Record { variable, low, high });
    }

    let root = reader.child()?;
    check(&records, root, None)?;
    Ok((records, root))
}

/// Writes a complete container file.
pub(crate) fn save<W: Write>(store: &NodeStore, kind: Kind, default: i32, roots: [Diagram; 2], mut w: W) -> Result<()> {
    w.write_all(MAGIC)?;
    w.write_all(&VERSION.to_be_bytes())?;
    w.write_all(&[kind.to_byte(), 0])?;
    w.write_all(&default.to_be_bytes())?;
    for diagram in roots {
        store.save_diagram(diagram, &mut w)?;
    }
    w.flush()?;
    info!("saved {:?} with default {}", kind, default);
    Ok(())
}

/// Reads a complete container file of the expected kind.
///
/// Returns the default value and the per-family diagrams.
pub(crate) fn load<R: Read>(store: &NodeStore, expected: Kind, r: R) -> Result<(i32, [Diagram; 2])> {
    let mut reader = Reader { inner: r };

    let magic: [u8; 6] = reader.bytes()?;
    if &magic != MAGIC {
        return Err(Error::format("bad magic number"));
    }
    let version = reader.u16()?;
    if version != VERSION {
        return Err(Error::format(format!("unsupported version {}", version)));
    }
    let kind = Kind::from_byte(reader.u8()?)?;
    if kind != expected {
        return Err(Error::format(format!("expected a {:?} file, found a {:?} file", expected, kind)));
    }
    if reader.u8()? != 0 {
        return Err(Error::format("reserved header byte is not zero"));
    }
    let default = reader.i32()?;
    if kind == Kind::Set && default != 0 {
        return Err(Error::format(format!("set default must be 0, found {}", default)));
    }

    let v4 = store.load_diagram(Family::V4, kind, &mut reader.inner)?;
    let v6 = store.load_diagram(Family::V6, kind, &mut reader.inner)?;
    reader.expect_eof()?;

    info!("loaded {:?} with default {}", kind, default);
    Ok((default, [v4, v6]))
}
