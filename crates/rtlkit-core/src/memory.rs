//! Block memories: read/write RAMs and read-only ROMs.
//!
//! A memory is not a vector. It is reached only through ports: each
//! [`Block::mem_read`] adds a `MemRead` net, each write adds a `MemWrite`
//! net `(addr, data, enable)`. Port counts are bounded by [`MemConfig`].
//!
//! Writes recorded while a conditional scope is open are not turned into
//! ports immediately; the conditional compiler merges them into a single
//! write port when the scope closes.

use std::fmt;
use std::sync::Arc;

use crate::block::Block;
use crate::conditional::{Assignment, Destination};
use crate::error::RtlError;
use crate::id::{MemId, NetId};
use crate::net::LogicNet;
use crate::ops::{Op, OpParam};
use crate::vector::{fits_in, Vector, VectorKind};

/// Port limits and addressing mode of a memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemConfig {
    /// Maximum number of read ports. `None` means unbounded. Default: 2.
    pub max_read_ports: Option<usize>,
    /// Maximum number of write ports. `None` means unbounded. Default: 1.
    pub max_write_ports: Option<usize>,
    /// Only registers may be used as addresses.
    pub sync_only: bool,
}

impl Default for MemConfig {
    fn default() -> Self {
        MemConfig {
            max_read_ports: Some(2),
            max_write_ports: Some(1),
            sync_only: false,
        }
    }
}

impl MemConfig {
    pub fn unbounded() -> Self {
        MemConfig {
            max_read_ports: None,
            max_write_ports: None,
            sync_only: false,
        }
    }
}

/// Contents of a ROM, evaluated lazily per address.
#[derive(Clone)]
pub enum RomData {
    /// Value at index `addr`; addresses past the end are access errors.
    Table(Vec<u64>),
    /// A pure function from address to value.
    Function(Arc<dyn Fn(u64) -> u64 + Send + Sync>),
}

impl RomData {
    pub fn function(f: impl Fn(u64) -> u64 + Send + Sync + 'static) -> Self {
        RomData::Function(Arc::new(f))
    }
}

impl fmt::Debug for RomData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RomData::Table(values) => f.debug_tuple("Table").field(values).finish(),
            RomData::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// A memory owned by a block.
#[derive(Debug, Clone)]
pub struct Memory {
    id: MemId,
    pub(crate) name: String,
    pub(crate) bitwidth: u32,
    pub(crate) addrwidth: u32,
    config: MemConfig,
    pub(crate) read_ports: Vec<NetId>,
    pub(crate) write_ports: Vec<NetId>,
    rom: Option<RomData>,
}

impl Memory {
    pub fn id(&self) -> MemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width of each stored word.
    pub fn bitwidth(&self) -> u32 {
        self.bitwidth
    }

    /// Width of the address bus; the memory holds `2^addrwidth` words.
    pub fn addrwidth(&self) -> u32 {
        self.addrwidth
    }

    pub fn config(&self) -> &MemConfig {
        &self.config
    }

    pub fn read_ports(&self) -> &[NetId] {
        &self.read_ports
    }

    pub fn write_ports(&self) -> &[NetId] {
        &self.write_ports
    }

    pub fn is_rom(&self) -> bool {
        self.rom.is_some()
    }

    /// Evaluates ROM contents at `addr`.
    ///
    /// Fails for RAMs, for addresses outside `2^addrwidth`, for table
    /// indices past the end, and for values that do not fit `bitwidth`.
    pub fn rom_value(&self, addr: u64) -> Result<u64, RtlError> {
        let access = |reason: String| RtlError::RomAccess {
            name: self.name.clone(),
            reason,
        };
        let Some(rom) = &self.rom else {
            return Err(access("not a rom".to_string()));
        };
        if !fits_in(addr, self.addrwidth) {
            return Err(access(format!("invalid address {}", addr)));
        }
        let value = match rom {
            RomData::Table(values) => *values
                .get(addr as usize)
                .ok_or_else(|| access(format!("index {} is out of range", addr)))?,
            RomData::Function(f) => f(addr),
        };
        if !fits_in(value, self.bitwidth) {
            return Err(access(format!(
                "value {} at address {} does not fit in {} bits",
                value, addr, self.bitwidth
            )));
        }
        Ok(value)
    }
}

impl Block {
    /// Creates a read/write memory.
    pub fn mem_block(
        &mut self,
        name: Option<&str>,
        bitwidth: u32,
        addrwidth: u32,
        config: MemConfig,
    ) -> Result<MemId, RtlError> {
        self.add_memory(name, bitwidth, addrwidth, config, None)
    }

    /// Creates a read-only memory with the given contents.
    pub fn rom_block(
        &mut self,
        name: Option<&str>,
        bitwidth: u32,
        addrwidth: u32,
        data: RomData,
        config: MemConfig,
    ) -> Result<MemId, RtlError> {
        self.add_memory(name, bitwidth, addrwidth, config, Some(data))
    }

    fn add_memory(
        &mut self,
        name: Option<&str>,
        bitwidth: u32,
        addrwidth: u32,
        config: MemConfig,
        rom: Option<RomData>,
    ) -> Result<MemId, RtlError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.next_tempvar_name(),
        };
        if bitwidth == 0 {
            return Err(RtlError::InvalidWidth {
                context: format!("bitwidth of memory '{}'", name),
                width: bitwidth,
            });
        }
        if addrwidth == 0 {
            return Err(RtlError::InvalidWidth {
                context: format!("address width of memory '{}'", name),
                width: addrwidth,
            });
        }
        if self.memory_by_name(&name).is_some() {
            return Err(RtlError::DuplicateName { name });
        }

        let id = self.next_memid();
        tracing::debug!(memory = %name, id = %id, rom = rom.is_some(), "created memory");
        self.memories.insert(
            id,
            Memory {
                id,
                name,
                bitwidth,
                addrwidth,
                config,
                read_ports: Vec::new(),
                write_ports: Vec::new(),
                rom,
            },
        );
        Ok(id)
    }

    pub fn memory(&self, id: MemId) -> Option<&Memory> {
        self.memories.get(&id)
    }

    pub fn memory_by_name(&self, name: &str) -> Option<&Memory> {
        self.memories.values().find(|m| m.name == name)
    }

    pub fn memories(&self) -> impl Iterator<Item = &Memory> {
        self.memories.values()
    }

    fn memory_strict(&self, id: MemId) -> Result<&Memory, RtlError> {
        self.memories.get(&id).ok_or(RtlError::MemoryNotFound { id })
    }

    fn check_address(&self, mem: &Memory, addr: Vector) -> Result<(), RtlError> {
        if mem.config.sync_only && self.kind(addr) != Some(VectorKind::Register) {
            return Err(RtlError::SyncOnlyAddress {
                name: mem.name.clone(),
                addr: self.name_of(addr),
            });
        }
        if addr.width() > mem.addrwidth {
            return Err(RtlError::WidthMismatch {
                context: format!("address of memory '{}'", mem.name),
                expected: mem.addrwidth,
                got: addr.width(),
            });
        }
        Ok(())
    }

    /// Adds an asynchronous read port and returns the data it produces.
    pub fn mem_read(&mut self, mem: MemId, addr: Vector) -> Result<Vector, RtlError> {
        let memory = self.memory_strict(mem)?;
        if let Some(limit) = memory.config.max_read_ports {
            if memory.read_ports.len() >= limit {
                return Err(RtlError::PortLimit {
                    name: memory.name.clone(),
                    kind: "read",
                    limit,
                });
            }
        }
        self.check_address(memory, addr)?;
        let bitwidth = memory.bitwidth;

        self.atomically(|b| {
            let data = b.wire(bitwidth)?;
            let net = b.add_net(LogicNet::new(
                Op::MemRead,
                OpParam::Memory(mem),
                [addr],
                [data],
            ))?;
            if let Some(memory) = b.memories.get_mut(&mem) {
                memory.read_ports.push(net);
            }
            Ok(data)
        })
    }

    /// Writes `data` to `addr` when `enable` (default: constant 1) is set.
    ///
    /// Outside a conditional scope this adds a write port immediately.
    /// Inside one the write is recorded under the current predicate and
    /// merged with the memory's other conditional writes when the scope
    /// closes. Data narrower than the memory is zero-extended.
    pub fn mem_write(
        &mut self,
        mem: MemId,
        addr: Vector,
        data: Vector,
        enable: Option<Vector>,
    ) -> Result<(), RtlError> {
        let memory = self.memory_strict(mem)?;
        if memory.is_rom() {
            return Err(RtlError::ReadOnlyMemory {
                name: memory.name.clone(),
            });
        }
        self.check_address(memory, addr)?;
        let (name, bitwidth) = (memory.name.clone(), memory.bitwidth);
        if data.width() > bitwidth {
            return Err(RtlError::WidthMismatch {
                context: format!("write data of memory '{}'", name),
                expected: bitwidth,
                got: data.width(),
            });
        }
        if let Some(enable) = enable {
            if enable.width() != 1 {
                return Err(RtlError::WidthMismatch {
                    context: format!("write enable of memory '{}'", name),
                    expected: 1,
                    got: enable.width(),
                });
            }
        }

        self.atomically(|b| {
            let enable = match enable {
                Some(enable) => enable,
                None => b.constant(1, 1)?,
            };
            let data = b.zero_extend(data, bitwidth)?;
            if b.under_condition() {
                b.record(
                    Destination::Memory(mem),
                    Assignment::Write { addr, data, enable },
                )
            } else {
                b.build_write_port(mem, addr, data, enable).map(|_| ())
            }
        })
    }

    /// Adds a physical write port. Used directly for unconditional writes
    /// and by the conditional compiler for merged ones.
    pub(crate) fn build_write_port(
        &mut self,
        mem: MemId,
        addr: Vector,
        data: Vector,
        enable: Vector,
    ) -> Result<NetId, RtlError> {
        let memory = self.memory_strict(mem)?;
        if let Some(limit) = memory.config.max_write_ports {
            if memory.write_ports.len() >= limit {
                return Err(RtlError::PortLimit {
                    name: memory.name.clone(),
                    kind: "write",
                    limit,
                });
            }
        }
        let net = self.add_net(LogicNet::new(
            Op::MemWrite,
            OpParam::Memory(mem),
            [addr, data, enable],
            [],
        ))?;
        if let Some(memory) = self.memories.get_mut(&mem) {
            memory.write_ports.push(net);
        }
        Ok(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_write_nets_pass_validation() {
        let mut block = Block::new();
        let ram = block.mem_block(Some("ram"), 8, 4, MemConfig::default()).unwrap();
        let addr = block.input("addr", 4).unwrap();
        let data = block.input("data", 8).unwrap();
        let out = block.output("out", 8).unwrap();

        block.mem_write(ram, addr, data, None).unwrap();
        let read = block.mem_read(ram, addr).unwrap();
        block.connect(out, read).unwrap();

        block.sanity_check().unwrap();
        let memory = block.memory(ram).unwrap();
        assert_eq!(memory.write_ports().len(), 1);
        assert_eq!(memory.read_ports().len(), 1);
        assert_eq!(block.net(memory.write_ports()[0]).unwrap().op, Op::MemWrite);
    }

    #[test]
    fn block_without_memwrite_in_legal_set_rejects_write_ports() {
        let legal = Op::ALL.into_iter().filter(|op| *op != Op::MemWrite);
        let mut block = Block::with_legal_ops(legal);
        let ram = block.mem_block(None, 8, 4, MemConfig::default()).unwrap();
        let addr = block.input("addr", 4).unwrap();
        let data = block.input("data", 8).unwrap();

        let err = block.mem_write(ram, addr, data, None).unwrap_err();
        assert!(matches!(err, RtlError::InvalidNet { .. }));
        assert!(block.memory(ram).unwrap().write_ports().is_empty());
    }

    #[test]
    fn rejected_conditional_write_adds_nothing() {
        use crate::conditional::ScopeEntry;

        let mut block = Block::new();
        let ram = block.mem_block(Some("ram"), 8, 2, MemConfig::default()).unwrap();
        let p = block.input("p", 1).unwrap();
        let q = block.input("q", 1).unwrap();
        let addr = block.input("addr", 2).unwrap();
        let data = block.input("data", 6).unwrap();

        block.open_conditional().unwrap();
        block.enter_predicate(ScopeEntry::Predicate(p)).unwrap();
        block.mem_write(ram, addr, data, None).unwrap();
        block.exit_predicate().unwrap();
        block.enter_predicate(ScopeEntry::Otherwise).unwrap();
        block.exit_predicate().unwrap();

        block.enter_predicate(ScopeEntry::Predicate(q)).unwrap();
        let (vectors, nets) = (block.vector_count(), block.net_count());
        let err = block.mem_write(ram, addr, data, None).unwrap_err();
        assert!(matches!(err, RtlError::ConflictingConditions { .. }));
        assert_eq!(block.vector_count(), vectors);
        assert_eq!(block.net_count(), nets);
        block.exit_predicate().unwrap();

        block.close_conditional(&[]).unwrap();
        assert_eq!(block.memory(ram).unwrap().write_ports().len(), 1);
    }

    #[test]
    fn port_limits_are_enforced() {
        let mut block = Block::new();
        let ram = block.mem_block(Some("ram"), 4, 2, MemConfig::default()).unwrap();
        let addr = block.input("addr", 2).unwrap();
        let data = block.input("data", 4).unwrap();

        block.mem_read(ram, addr).unwrap();
        block.mem_read(ram, addr).unwrap();
        assert_eq!(
            block.mem_read(ram, addr).unwrap_err(),
            RtlError::PortLimit {
                name: "ram".into(),
                kind: "read",
                limit: 2
            }
        );

        block.mem_write(ram, addr, data, None).unwrap();
        assert!(matches!(
            block.mem_write(ram, addr, data, None),
            Err(RtlError::PortLimit { kind: "write", .. })
        ));
    }

    #[test]
    fn unbounded_memories_take_any_number_of_ports() {
        let mut block = Block::new();
        let ram = block.mem_block(None, 4, 2, MemConfig::unbounded()).unwrap();
        let addr = block.input("addr", 2).unwrap();
        for _ in 0..5 {
            block.mem_read(ram, addr).unwrap();
        }
        assert_eq!(block.memory(ram).unwrap().read_ports().len(), 5);
    }

    #[test]
    fn address_and_data_widths_are_checked() {
        let mut block = Block::new();
        let ram = block.mem_block(Some("ram"), 4, 2, MemConfig::default()).unwrap();
        let wide_addr = block.input("wide_addr", 3).unwrap();
        let addr = block.input("addr", 2).unwrap();
        let wide_data = block.input("wide_data", 5).unwrap();
        let wide_enable = block.input("we", 2).unwrap();
        let data = block.input("data", 4).unwrap();

        assert!(matches!(
            block.mem_read(ram, wide_addr),
            Err(RtlError::WidthMismatch {
                expected: 2,
                got: 3,
                ..
            })
        ));
        assert!(matches!(
            block.mem_write(ram, addr, wide_data, None),
            Err(RtlError::WidthMismatch {
                expected: 4,
                got: 5,
                ..
            })
        ));
        assert!(matches!(
            block.mem_write(ram, addr, data, Some(wide_enable)),
            Err(RtlError::WidthMismatch {
                expected: 1,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn sync_only_memories_need_register_addresses() {
        let mut block = Block::new();
        let config = MemConfig {
            sync_only: true,
            ..MemConfig::default()
        };
        let ram = block.mem_block(Some("ram"), 4, 2, config).unwrap();
        let addr = block.input("addr", 2).unwrap();
        let reg = block.named_register("raddr", 2).unwrap();

        assert!(matches!(
            block.mem_read(ram, addr),
            Err(RtlError::SyncOnlyAddress { .. })
        ));
        block.mem_read(ram, reg).unwrap();
    }

    #[test]
    fn memory_widths_must_be_positive_and_names_unique() {
        let mut block = Block::new();
        assert!(matches!(
            block.mem_block(Some("m"), 0, 2, MemConfig::default()),
            Err(RtlError::InvalidWidth { .. })
        ));
        assert!(matches!(
            block.mem_block(Some("m"), 2, 0, MemConfig::default()),
            Err(RtlError::InvalidWidth { .. })
        ));
        block.mem_block(Some("m"), 2, 2, MemConfig::default()).unwrap();
        assert!(matches!(
            block.mem_block(Some("m"), 2, 2, MemConfig::default()),
            Err(RtlError::DuplicateName { .. })
        ));
    }

    #[test]
    fn roms_are_read_only_and_evaluate_lazily() {
        let mut block = Block::new();
        // Bad contents are accepted at construction.
        let rom = block
            .rom_block(
                Some("rom"),
                4,
                3,
                RomData::Table(vec![1, 2, 3, 99]),
                MemConfig::default(),
            )
            .unwrap();
        let addr = block.input("addr", 3).unwrap();
        let data = block.input("data", 4).unwrap();
        assert!(matches!(
            block.mem_write(rom, addr, data, None),
            Err(RtlError::ReadOnlyMemory { .. })
        ));

        let memory = block.memory(rom).unwrap();
        assert_eq!(memory.rom_value(2).unwrap(), 3);
        assert!(matches!(memory.rom_value(3), Err(RtlError::RomAccess { .. })));
        assert!(matches!(memory.rom_value(5), Err(RtlError::RomAccess { .. })));
        assert!(matches!(memory.rom_value(8), Err(RtlError::RomAccess { .. })));
    }

    #[test]
    fn function_roms() {
        let mut block = Block::new();
        let rom = block
            .rom_block(
                None,
                8,
                4,
                RomData::function(|addr| addr * 17),
                MemConfig::default(),
            )
            .unwrap();
        let memory = block.memory(rom).unwrap();
        assert_eq!(memory.rom_value(15).unwrap(), 255);
        assert_eq!(memory.rom_value(0).unwrap(), 0);
        assert!(memory.is_rom());
    }

    #[test]
    fn ram_has_no_rom_contents() {
        let mut block = Block::new();
        let ram = block.mem_block(None, 8, 4, MemConfig::default()).unwrap();
        assert!(matches!(
            block.memory(ram).unwrap().rom_value(0),
            Err(RtlError::RomAccess { .. })
        ));
    }
}
