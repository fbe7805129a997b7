//! Stable ID newtypes for netlist entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, so a [`NetId`] cannot be
//! used where a [`VectorId`] is expected. Vectors, nets and memories are
//! stored by index inside their owning [`Block`](crate::block::Block); the
//! [`BlockId`] lets a handle be checked against the block it is used with.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Identity of a bit-vector within its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VectorId(pub u32);

/// Identity of a logic net within its block. Nets are numbered in insertion
/// order; only nets added by a failed operation are ever removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetId(pub u32);

/// Identity of a memory (RAM or ROM) within its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemId(pub u32);

/// Process-unique identity of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Allocates a block id that no other block in this process shares.
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        BlockId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Bridge between NetId and the node indices of the dependency graph.

impl From<NodeIndex<u32>> for NetId {
    fn from(idx: NodeIndex<u32>) -> Self {
        NetId(idx.index() as u32)
    }
}

impl From<NetId> for NodeIndex<u32> {
    fn from(id: NetId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_id_to_node_index_roundtrip() {
        let idx = NodeIndex::<u32>::new(42);
        let net = NetId::from(idx);
        assert_eq!(net.0, 42);

        let back: NodeIndex<u32> = net.into();
        assert_eq!(back.index(), 42);
    }

    #[test]
    fn fresh_block_ids_are_distinct() {
        let a = BlockId::fresh();
        let b = BlockId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", VectorId(7)), "7");
        assert_eq!(format!("{}", NetId(99)), "99");
        assert_eq!(format!("{}", MemId(3)), "3");
    }
}
