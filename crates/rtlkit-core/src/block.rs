//! Block: the netlist container.
//!
//! [`Block`] is the single entry point for constructing and querying a
//! design. It owns every bit-vector (as an arena of [`VectorInfo`] keyed by
//! [`VectorId`]), every [`LogicNet`] (numbered by [`NetId`] in insertion
//! order) and every memory. Handles handed out to callers are plain
//! [`Vector`] values carrying the block's [`BlockId`], which `add_net` checks
//! so that nets never connect vectors of different blocks.
//!
//! Structural invariants enforced on insertion:
//! - vector names are unique within the block;
//! - every vector a net touches is registered here;
//! - equal-width ops have equal operand widths and each op's output width
//!   follows from its inputs;
//! - a vector has at most one driving net, and inputs and constants have none.
//!
//! [`Block::sanity_check`] re-verifies the container as a whole and
//! additionally rejects vectors that no net references. Builders that fail
//! roll back whatever they allocated, so a recovered error never leaves such
//! a vector behind.
//!
//! Construction helpers live in `build`, memories in `memory` and the
//! conditional-assignment compiler in `conditional`; all are `impl Block`
//! blocks over this container.

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use petgraph::graph::DiGraph;

use crate::conditional::ConditionalState;
use crate::error::RtlError;
use crate::id::{BlockId, MemId, NetId, VectorId};
use crate::memory::Memory;
use crate::net::LogicNet;
use crate::ops::{Op, OpParam};
use crate::vector::{fits_in, min_width, Vector, VectorInfo, VectorKind};

/// Dependency graph over nets: an edge `p -> c` means net `c` reads a vector
/// driven by net `p`. Node weights are the net ids; node indices equal them.
pub type NetGraph = DiGraph<NetId, VectorId, u32>;

/// Sizes of the block's tables at some point, for [`Block::rollback`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    nets: usize,
    vectors: usize,
    memories: usize,
    tempvar_count: u32,
}

/// A hardware connectivity graph.
#[derive(Debug)]
pub struct Block {
    id: BlockId,
    nets: Vec<LogicNet>,
    vectors: IndexMap<VectorId, VectorInfo>,
    by_name: HashMap<String, VectorId>,
    drivers: HashMap<VectorId, NetId>,
    pub(crate) memories: IndexMap<MemId, Memory>,
    legal_ops: HashSet<Op>,
    next_vector_id: u32,
    tempvar_count: u32,
    memid_count: u32,
    /// Open conditional-assignment session, if any.
    pub(crate) conditional: Option<ConditionalState>,
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl Block {
    /// Creates an empty block accepting every op tag.
    pub fn new() -> Self {
        Self::with_legal_ops(Op::ALL)
    }

    /// Creates an empty block that only accepts nets of the given ops.
    ///
    /// Downstream passes use this to build blocks restricted to a lowered
    /// subset of the tag set.
    pub fn with_legal_ops(ops: impl IntoIterator<Item = Op>) -> Self {
        Block {
            id: BlockId::fresh(),
            nets: Vec::new(),
            vectors: IndexMap::new(),
            by_name: HashMap::new(),
            drivers: HashMap::new(),
            memories: IndexMap::new(),
            legal_ops: ops.into_iter().collect(),
            next_vector_id: 0,
            tempvar_count: 1,
            memid_count: 0,
            conditional: None,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> BlockId {
        self.id
    }

    /// All nets in insertion order; the index of a net is its [`NetId`].
    pub fn nets(&self) -> &[LogicNet] {
        &self.nets
    }

    pub fn net(&self, id: NetId) -> Option<&LogicNet> {
        self.nets.get(id.0 as usize)
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    pub fn vector_count(&self) -> usize {
        self.vectors.len()
    }

    pub fn legal_ops(&self) -> &HashSet<Op> {
        &self.legal_ops
    }

    /// Iterates over every registered vector in registration order.
    pub fn vectors(&self) -> impl Iterator<Item = (Vector, &VectorInfo)> + '_ {
        self.vectors
            .iter()
            .map(move |(&id, info)| (Vector::new(id, info.width, self.id), info))
    }

    /// Returns the vectors whose kind satisfies `filter`.
    pub fn vectors_of_kind(&self, filter: impl Fn(&VectorKind) -> bool) -> Vec<Vector> {
        self.vectors()
            .filter(|(_, info)| filter(&info.kind))
            .map(|(v, _)| v)
            .collect()
    }

    /// Looks up the metadata of a vector handle.
    pub fn info(&self, v: Vector) -> Option<&VectorInfo> {
        if v.block() != self.id {
            return None;
        }
        self.vectors.get(&v.id())
    }

    pub fn kind(&self, v: Vector) -> Option<VectorKind> {
        self.info(v).map(|info| info.kind)
    }

    /// Returns the name of a vector, or a placeholder for foreign handles.
    pub fn name_of(&self, v: Vector) -> String {
        match self.info(v) {
            Some(info) => info.name.clone(),
            None => format!("<vector {} of block {}>", v.id(), v.block()),
        }
    }

    pub fn vector_by_name(&self, name: &str) -> Option<Vector> {
        let id = *self.by_name.get(name)?;
        let info = self.vectors.get(&id)?;
        Some(Vector::new(id, info.width, self.id))
    }

    /// Like [`vector_by_name`](Self::vector_by_name) but errors when absent.
    pub fn vector_by_name_strict(&self, name: &str) -> Result<Vector, RtlError> {
        self.vector_by_name(name).ok_or_else(|| RtlError::UnknownVector {
            name: name.to_string(),
        })
    }

    /// The net driving `v`, if any.
    pub fn driver_of(&self, v: Vector) -> Option<NetId> {
        if v.block() != self.id {
            return None;
        }
        self.drivers.get(&v.id()).copied()
    }

    /// Verifies `v` is a registered handle of this block.
    pub(crate) fn check_member(&self, v: Vector) -> Result<&VectorInfo, RtlError> {
        if v.block() != self.id {
            return Err(RtlError::ForeignVector {
                name: format!("vector {} of block {}", v.id(), v.block()),
            });
        }
        self.vectors.get(&v.id()).ok_or_else(|| RtlError::UnknownVector {
            name: format!("VectorId({})", v.id()),
        })
    }

    pub(crate) fn check_readable(&self, v: Vector) -> Result<&VectorInfo, RtlError> {
        let info = self.check_member(v)?;
        if !info.kind.is_readable() {
            return Err(RtlError::NotReadable {
                name: info.name.clone(),
                kind: info.kind.name(),
            });
        }
        Ok(info)
    }

    // -----------------------------------------------------------------------
    // Unique names
    // -----------------------------------------------------------------------

    /// Generates a fresh temporary name, skipping names already in use.
    pub fn next_tempvar_name(&mut self) -> String {
        loop {
            let name = format!("tmp{}", self.tempvar_count);
            self.tempvar_count += 1;
            if !self.by_name.contains_key(&name) {
                return name;
            }
        }
    }

    /// Generates a fresh name for a constant of the given value.
    pub fn next_constvar_name(&mut self, value: u64) -> String {
        loop {
            let name = format!("const{}_{}", self.tempvar_count, value);
            self.tempvar_count += 1;
            if !self.by_name.contains_key(&name) {
                return name;
            }
        }
    }

    pub(crate) fn next_memid(&mut self) -> MemId {
        self.memid_count += 1;
        MemId(self.memid_count)
    }

    // -----------------------------------------------------------------------
    // Vector registration
    // -----------------------------------------------------------------------

    /// Registers a new bit-vector and returns its handle.
    ///
    /// A `None` name gets an auto-generated one. Fails if the width is zero,
    /// if a constant does not fit its width, or if the name is taken.
    pub fn add_vector(
        &mut self,
        name: Option<&str>,
        width: u32,
        kind: VectorKind,
    ) -> Result<Vector, RtlError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => match kind {
                VectorKind::Const { value } => self.next_constvar_name(value),
                _ => self.next_tempvar_name(),
            },
        };
        if width == 0 {
            return Err(RtlError::InvalidWidth {
                context: format!("vector '{}'", name),
                width,
            });
        }
        if let VectorKind::Const { value } = kind {
            if !fits_in(value, width) {
                return Err(RtlError::InvalidWidth {
                    context: format!("constant {} ('{}')", value, name),
                    width,
                });
            }
        }
        if self.by_name.contains_key(&name) {
            return Err(RtlError::DuplicateName { name });
        }

        let id = VectorId(self.next_vector_id);
        self.next_vector_id += 1;
        self.by_name.insert(name.clone(), id);
        self.vectors.insert(id, VectorInfo { name, width, kind });
        Ok(Vector::new(id, width, self.id))
    }

    pub fn input(&mut self, name: &str, width: u32) -> Result<Vector, RtlError> {
        self.add_vector(Some(name), width, VectorKind::Input)
    }

    pub fn output(&mut self, name: &str, width: u32) -> Result<Vector, RtlError> {
        self.add_vector(Some(name), width, VectorKind::Output)
    }

    /// A fresh, auto-named wire.
    pub fn wire(&mut self, width: u32) -> Result<Vector, RtlError> {
        self.add_vector(None, width, VectorKind::Wire)
    }

    pub fn named_wire(&mut self, name: &str, width: u32) -> Result<Vector, RtlError> {
        self.add_vector(Some(name), width, VectorKind::Wire)
    }

    pub fn register(&mut self, width: u32) -> Result<Vector, RtlError> {
        self.add_vector(None, width, VectorKind::Register)
    }

    pub fn named_register(&mut self, name: &str, width: u32) -> Result<Vector, RtlError> {
        self.add_vector(Some(name), width, VectorKind::Register)
    }

    /// A constant of an explicit width.
    pub fn constant(&mut self, value: u64, width: u32) -> Result<Vector, RtlError> {
        self.add_vector(None, width, VectorKind::Const { value })
    }

    /// A constant of the smallest width that holds `value`.
    pub fn constant_fit(&mut self, value: u64) -> Result<Vector, RtlError> {
        self.constant(value, min_width(value))
    }

    // -----------------------------------------------------------------------
    // Net insertion
    // -----------------------------------------------------------------------

    /// Adds a net connecting vectors previously registered with this block.
    pub fn add_net(&mut self, net: LogicNet) -> Result<NetId, RtlError> {
        if !self.legal_ops.contains(&net.op) {
            return Err(RtlError::InvalidNet {
                reason: format!("op '{}' is not legal in this block", net.op.symbol()),
            });
        }
        if !net.op.arity().accepts(net.args.len()) {
            return Err(RtlError::InvalidNet {
                reason: format!(
                    "op '{}' cannot take {} inputs",
                    net.op.symbol(),
                    net.args.len()
                ),
            });
        }
        if net.dests.len() != net.op.output_count() {
            return Err(RtlError::InvalidNet {
                reason: format!(
                    "op '{}' drives {} outputs, got {}",
                    net.op.symbol(),
                    net.op.output_count(),
                    net.dests.len()
                ),
            });
        }

        for &arg in &net.args {
            self.check_readable(arg)?;
        }
        for &dest in &net.dests {
            let info = self.check_member(dest)?;
            let by_register = net.op == Op::Register;
            let register_dest = info.kind == VectorKind::Register;
            if !info.kind.is_drivable() || by_register != register_dest {
                return Err(RtlError::NotDrivable {
                    name: info.name.clone(),
                    kind: info.kind.name(),
                });
            }
            if self.drivers.contains_key(&dest.id()) {
                return Err(RtlError::AlreadyDriven {
                    name: info.name.clone(),
                });
            }
        }

        self.check_net_widths(&net)?;

        // After all that checking, actually update the data structure.
        let id = NetId(self.nets.len() as u32);
        for dest in &net.dests {
            self.drivers.insert(dest.id(), id);
        }
        tracing::trace!(net = %id, op = %net.op.symbol(), "added net");
        self.nets.push(net);
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Rollback
    // -----------------------------------------------------------------------

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nets: self.nets.len(),
            vectors: self.vectors.len(),
            memories: self.memories.len(),
            tempvar_count: self.tempvar_count,
        }
    }

    /// Drops every vector, net, memory and port added since `cp`.
    ///
    /// Ids are never reused, so handles to dropped vectors stay invalid
    /// instead of aliasing later ones.
    pub(crate) fn rollback(&mut self, cp: Checkpoint) {
        if self.vectors.len() > cp.vectors {
            for (_, info) in self.vectors.drain(cp.vectors..) {
                self.by_name.remove(&info.name);
            }
        }
        self.nets.truncate(cp.nets);
        self.drivers.retain(|_, net| (net.0 as usize) < cp.nets);
        self.memories.truncate(cp.memories);
        for memory in self.memories.values_mut() {
            memory.read_ports.retain(|net| (net.0 as usize) < cp.nets);
            memory.write_ports.retain(|net| (net.0 as usize) < cp.nets);
        }
        self.tempvar_count = cp.tempvar_count;
    }

    /// Runs `f`, undoing everything it added to the block if it fails.
    pub(crate) fn atomically<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, RtlError>,
    ) -> Result<T, RtlError> {
        let cp = self.checkpoint();
        let result = f(self);
        if result.is_err() {
            self.rollback(cp);
        }
        result
    }

    fn check_net_widths(&self, net: &LogicNet) -> Result<(), RtlError> {
        let symbol = net.op.symbol();
        let expect = |context: &str, expected: u32, got: u32| {
            if expected == got {
                Ok(())
            } else {
                Err(RtlError::WidthMismatch {
                    context: format!("{} of '{}' net", context, symbol),
                    expected,
                    got,
                })
            }
        };

        if net.op.requires_equal_widths() {
            let first = net.args[0].width();
            for arg in &net.args[1..] {
                expect("operands", first, arg.width())?;
            }
        }

        let out = net.dest().map(|d| d.width()).unwrap_or(0);
        let arg = |i: usize| net.args[i].width();
        let widen = |width: Option<u32>| {
            width.ok_or_else(|| RtlError::InvalidWidth {
                context: format!("output of '{}' net exceeds u32 bits", symbol),
                width: out,
            })
        };
        match net.op {
            Op::Wire | Op::Not | Op::And | Op::Or | Op::Xor | Op::Register => {
                expect("output", arg(0), out)
            }
            Op::Add | Op::Sub => expect("output", widen(arg(0).checked_add(1))?, out),
            Op::Mul => expect("output", widen(arg(0).checked_mul(2))?, out),
            Op::Eq => expect("output", 1, out),
            Op::Mux => {
                expect("select", 1, arg(0))?;
                expect("cases", arg(1), arg(2))?;
                expect("output", arg(1), out)
            }
            Op::Concat => {
                let total = net
                    .args
                    .iter()
                    .try_fold(0u32, |acc, v| acc.checked_add(v.width()));
                expect("output", widen(total)?, out)
            }
            Op::Select => {
                let OpParam::Bits(bits) = &net.param else {
                    return Err(RtlError::InvalidNet {
                        reason: "select net without bit indices".into(),
                    });
                };
                if let Some(&bad) = bits.iter().find(|&&b| b >= arg(0)) {
                    return Err(RtlError::InvalidNet {
                        reason: format!("bit {} out of range for width {}", bad, arg(0)),
                    });
                }
                expect("output", bits.len() as u32, out)
            }
            Op::MemRead | Op::MemWrite => {
                let OpParam::Memory(mem_id) = net.param else {
                    return Err(RtlError::InvalidNet {
                        reason: "memory net without a memory".into(),
                    });
                };
                let mem = self
                    .memories
                    .get(&mem_id)
                    .ok_or(RtlError::MemoryNotFound { id: mem_id })?;
                if arg(0) > mem.addrwidth {
                    return Err(RtlError::WidthMismatch {
                        context: format!("address of memory '{}'", mem.name),
                        expected: mem.addrwidth,
                        got: arg(0),
                    });
                }
                if net.op == Op::MemRead {
                    expect("read data", mem.bitwidth, out)
                } else {
                    expect("write data", mem.bitwidth, arg(1))?;
                    expect("write enable", 1, arg(2))
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Whole-block checks and queries
    // -----------------------------------------------------------------------

    /// Checks the block as a whole.
    ///
    /// Fails if a name is duplicated, if a net references a vector unknown to
    /// the block, or if a registered vector is referenced by no net.
    pub fn sanity_check(&self) -> Result<(), RtlError> {
        let mut seen = HashSet::new();
        for info in self.vectors.values() {
            if !seen.insert(info.name.as_str()) {
                return Err(RtlError::DuplicateName {
                    name: info.name.clone(),
                });
            }
        }

        let mut connected = HashSet::new();
        for net in &self.nets {
            for v in net.vectors() {
                if v.block() != self.id || !self.vectors.contains_key(&v.id()) {
                    return Err(RtlError::UnknownVector {
                        name: self.name_of(*v),
                    });
                }
                connected.insert(v.id());
            }
        }

        let unconnected: Vec<String> = self
            .vectors
            .iter()
            .filter(|(id, _)| !connected.contains(*id))
            .map(|(_, info)| info.name.clone())
            .collect();
        if !unconnected.is_empty() {
            return Err(RtlError::Unconnected { names: unconnected });
        }
        Ok(())
    }

    /// Builds the combinational dependency graph between nets.
    ///
    /// Values produced by `Register` nets are state available at the start of
    /// a cycle, so reads of a register do not create an edge. Every other
    /// producer-consumer pair does.
    pub fn dependency_graph(&self) -> NetGraph {
        let mut graph = NetGraph::with_capacity(self.nets.len(), self.nets.len() * 2);
        for i in 0..self.nets.len() {
            graph.add_node(NetId(i as u32));
        }
        for (i, net) in self.nets.iter().enumerate() {
            for arg in &net.args {
                let Some(&producer) = self.drivers.get(&arg.id()) else {
                    continue;
                };
                if self.nets[producer.0 as usize].op == Op::Register {
                    continue;
                }
                graph.add_edge(producer.into(), NetId(i as u32).into(), arg.id());
            }
        }
        graph
    }

    fn render_vector(&self, v: &Vector) -> String {
        match self.info(*v) {
            Some(info) => format!("{}/{}{}", info.name, info.width, info.kind.tag()),
            None => self.name_of(*v),
        }
    }
}

impl fmt::Display for Block {
    /// One net per line: `dests <-- op -- args (param)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, net) in self.nets.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let dests: Vec<String> = net.dests.iter().map(|v| self.render_vector(v)).collect();
            let args: Vec<String> = net.args.iter().map(|v| self.render_vector(v)).collect();
            write!(
                f,
                "{} <-- {} -- {}",
                dests.join(", "),
                net.op.symbol(),
                args.join(", ")
            )?;
            match &net.param {
                OpParam::None => {}
                OpParam::Bits(bits) => {
                    let bits: Vec<String> = bits.iter().map(u32::to_string).collect();
                    write!(f, " ({})", bits.join(", "))?;
                }
                OpParam::Memory(id) => match self.memories.get(id) {
                    Some(mem) => write!(f, " (mem {})", mem.name)?,
                    None => write!(f, " (mem #{})", id)?,
                },
            }
        }
        Ok(())
    }
}
