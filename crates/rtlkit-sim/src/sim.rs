//! Cycle-stepped evaluation of a finalized block.
//!
//! A [`Simulation`] borrows a [`Block`] that has passed
//! [`Block::sanity_check`] and evaluates it one clock cycle at a time:
//!
//! 1. inputs, constants and register state are loaded;
//! 2. combinational nets run in topological order of the block's
//!    dependency graph (register outputs break every cycle);
//! 3. the cycle is traced if enabled;
//! 4. register next-values and enabled memory writes are latched.
//!
//! Memory reads in step 2 see the contents from before any write latched in
//! step 4 of the same cycle.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;

use rtlkit_core::vector::fits_in;
use rtlkit_core::{Block, LogicNet, MemId, NetId, Op, OpParam, Vector, VectorId, VectorKind};

use crate::error::SimError;
use crate::trace::TraceEntry;

/// Configuration for a simulation run.
#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    /// Whether to record a [`TraceEntry`] per cycle.
    pub trace_enabled: bool,
    /// Initial RAM contents; unlisted words start at 0.
    pub memory_init: HashMap<MemId, HashMap<u64, u64>>,
}

/// A running simulation of one block.
pub struct Simulation<'b> {
    block: &'b Block,
    config: SimConfig,
    /// Every net, in an order where producers precede consumers.
    order: Vec<NetId>,
    /// Values computed in the most recent cycle.
    values: HashMap<VectorId, u64>,
    registers: HashMap<VectorId, u64>,
    memories: HashMap<MemId, HashMap<u64, u64>>,
    cycle: u64,
    trace: Vec<TraceEntry>,
}

fn mask(width: u32) -> u128 {
    (1u128 << width) - 1
}

impl<'b> Simulation<'b> {
    /// Prepares `block` for simulation. Registers start at 0.
    pub fn new(block: &'b Block, config: SimConfig) -> Result<Self, SimError> {
        if block.under_condition() {
            return Err(SimError::ConditionalOpen);
        }
        block.sanity_check()?;

        for (_, info) in block.vectors() {
            if info.width > 64 {
                return Err(SimError::UnsupportedWidth {
                    name: info.name.clone(),
                    width: info.width,
                });
            }
        }
        for mem in block.memories() {
            if mem.bitwidth() > 64 || mem.addrwidth() > 64 {
                return Err(SimError::UnsupportedWidth {
                    name: mem.name().to_string(),
                    width: mem.bitwidth().max(mem.addrwidth()),
                });
            }
        }

        let graph = block.dependency_graph();
        let order = toposort(&graph, None)
            .map_err(|cycle| SimError::CombinationalLoop {
                net: cycle.node_id().into(),
            })?
            .into_iter()
            .map(NetId::from)
            .collect();

        let registers = block
            .vectors_of_kind(|k| *k == VectorKind::Register)
            .into_iter()
            .map(|r| (r.id(), 0))
            .collect();

        let mut memories = HashMap::new();
        for mem in block.memories().filter(|m| !m.is_rom()) {
            let init = config.memory_init.get(&mem.id()).cloned().unwrap_or_default();
            memories.insert(mem.id(), init);
        }

        tracing::debug!(nets = block.net_count(), "prepared simulation");
        Ok(Simulation {
            block,
            config,
            order,
            values: HashMap::new(),
            registers,
            memories,
            cycle: 0,
            trace: Vec::new(),
        })
    }

    /// Number of completed cycles.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Value of `v` computed during the most recent cycle.
    pub fn inspect(&self, v: Vector) -> Option<u64> {
        self.values.get(&v.id()).copied()
    }

    pub fn inspect_by_name(&self, name: &str) -> Option<u64> {
        self.inspect(self.block.vector_by_name(name)?)
    }

    /// Current state of a register: the value it will present next cycle.
    pub fn register_value(&self, reg: Vector) -> Option<u64> {
        self.registers.get(&reg.id()).copied()
    }

    /// Current contents of a RAM word.
    pub fn memory_value(&self, mem: MemId, addr: u64) -> u64 {
        self.memories
            .get(&mem)
            .and_then(|words| words.get(&addr))
            .copied()
            .unwrap_or(0)
    }

    /// Runs one clock cycle with the given input values.
    pub fn step<'a>(
        &mut self,
        inputs: impl IntoIterator<Item = (&'a str, u64)>,
    ) -> Result<(), SimError> {
        let mut supplied: HashMap<&str, u64> = HashMap::new();
        for (name, value) in inputs {
            supplied.insert(name, value);
        }

        let mut values = HashMap::new();
        for (v, info) in self.block.vectors() {
            let value = match info.kind {
                VectorKind::Input => {
                    let value = supplied.remove(info.name.as_str()).ok_or_else(|| {
                        SimError::MissingInput {
                            name: info.name.clone(),
                        }
                    })?;
                    if !fits_in(value, info.width) {
                        return Err(SimError::ValueTooWide {
                            name: info.name.clone(),
                            value,
                            width: info.width,
                        });
                    }
                    value
                }
                VectorKind::Const { value } => value,
                VectorKind::Register => self.registers.get(&v.id()).copied().unwrap_or(0),
                VectorKind::Wire | VectorKind::Output => continue,
            };
            values.insert(v.id(), value);
        }
        if let Some(name) = supplied.into_keys().next() {
            return Err(SimError::UnknownInput {
                name: name.to_string(),
            });
        }
        self.values = values;

        for &id in &self.order {
            let net = self.net(id)?;
            if net.op.is_stateful() {
                continue;
            }
            let out = self.eval(net)?;
            if let Some(dest) = net.dest() {
                self.values.insert(dest.id(), out);
            }
        }

        if self.config.trace_enabled {
            let values: BTreeMap<String, u64> = self
                .block
                .vectors()
                .filter_map(|(v, info)| Some((info.name.clone(), self.inspect(v)?)))
                .collect();
            self.trace.push(TraceEntry {
                cycle: self.cycle,
                values,
            });
        }

        self.latch()?;
        tracing::trace!(cycle = self.cycle, "stepped");
        self.cycle += 1;
        Ok(())
    }

    fn latch(&mut self) -> Result<(), SimError> {
        let mut next_registers = Vec::new();
        let mut writes = Vec::new();
        for net in self.block.nets() {
            match (net.op, &net.param) {
                (Op::Register, _) => {
                    let dest = net
                        .dest()
                        .ok_or_else(|| internal("register net without output"))?;
                    next_registers.push((dest.id(), self.arg(net, 0)?));
                }
                (Op::MemWrite, OpParam::Memory(mem)) => {
                    if self.arg(net, 2)? == 1 {
                        writes.push((*mem, self.arg(net, 0)?, self.arg(net, 1)?));
                    }
                }
                _ => {}
            }
        }

        for (reg, value) in next_registers {
            self.registers.insert(reg, value);
        }
        for (mem, addr, data) in writes {
            tracing::trace!(memory = %mem, addr, data, "memory write");
            self.memories.entry(mem).or_default().insert(addr, data);
        }
        Ok(())
    }

    fn net(&self, id: NetId) -> Result<&'b LogicNet, SimError> {
        self.block
            .net(id)
            .ok_or_else(|| internal(format!("net {} not in block", id)))
    }

    fn arg(&self, net: &LogicNet, index: usize) -> Result<u64, SimError> {
        let v = net
            .args
            .get(index)
            .ok_or_else(|| internal(format!("missing operand {}", index)))?;
        self.inspect(*v)
            .ok_or_else(|| internal(format!("'{}' evaluated out of order", self.block.name_of(*v))))
    }

    fn eval(&self, net: &LogicNet) -> Result<u64, SimError> {
        let width = net.dest().map(|d| d.width()).unwrap_or(0);
        let a = |i| self.arg(net, i).map(u128::from);

        let out: u128 = match net.op {
            Op::Wire => a(0)?,
            Op::Not => !a(0)?,
            Op::And => a(0)? & a(1)?,
            Op::Or => a(0)? | a(1)?,
            Op::Xor => a(0)? ^ a(1)?,
            Op::Add => a(0)? + a(1)?,
            Op::Sub => a(0)?.wrapping_sub(a(1)?),
            Op::Mul => a(0)? * a(1)?,
            Op::Eq => u128::from(a(0)? == a(1)?),
            Op::Mux => {
                if a(0)? == 1 {
                    a(2)?
                } else {
                    a(1)?
                }
            }
            Op::Concat => {
                let mut acc = 0u128;
                for (i, part) in net.args.iter().enumerate() {
                    acc = (acc << part.width()) | a(i)?;
                }
                acc
            }
            Op::Select => {
                let OpParam::Bits(bits) = &net.param else {
                    return Err(internal("select without bit indices"));
                };
                let value = a(0)?;
                bits.iter()
                    .enumerate()
                    .fold(0, |acc, (i, &bit)| acc | (((value >> bit) & 1) << i))
            }
            Op::MemRead => {
                let OpParam::Memory(mem) = net.param else {
                    return Err(internal("memory read without memory"));
                };
                let addr = self.arg(net, 0)?;
                let memory = self
                    .block
                    .memory(mem)
                    .ok_or(rtlkit_core::RtlError::MemoryNotFound { id: mem })?;
                let value = if memory.is_rom() {
                    memory.rom_value(addr)?
                } else {
                    self.memory_value(mem, addr)
                };
                u128::from(value)
            }
            Op::Register | Op::MemWrite => {
                return Err(internal("stateful net evaluated combinationally"));
            }
        };
        Ok((out & mask(width)) as u64)
    }
}

fn internal(message: impl Into<String>) -> SimError {
    SimError::Internal {
        message: message.into(),
    }
}
