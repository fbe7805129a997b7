//! Typed bit-vector handles and their metadata.
//!
//! A [`Vector`] is a small `Copy` handle: identity, width and the id of the
//! block that owns it. The block keeps the richer [`VectorInfo`] (name and
//! [`VectorKind`]) in its arena; handles never own anything.

use serde::{Deserialize, Serialize};

use crate::id::{BlockId, VectorId};

/// The kind of a bit-vector, determining which operations are permitted on
/// it and what value it holds when nothing assigns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorKind {
    /// Plain combinational wire. Defaults to 0 under conditional assignment.
    Wire,
    /// Externally supplied value; never driven by internal logic.
    Input,
    /// Terminal value observed outside the design; never read internally.
    Output,
    /// Fixed value, never driven.
    Const { value: u64 },
    /// Clocked state. Driven through `connect_next`; holds its previous
    /// value when not assigned.
    Register,
}

impl VectorKind {
    /// Returns `true` if internal logic may drive a vector of this kind.
    pub fn is_drivable(&self) -> bool {
        matches!(self, VectorKind::Wire | VectorKind::Output | VectorKind::Register)
    }

    /// Returns `true` if the vector carries state across cycles.
    pub fn is_stateful(&self) -> bool {
        matches!(self, VectorKind::Register)
    }

    /// Returns `true` if the vector may be used as a net operand.
    pub fn is_readable(&self) -> bool {
        !matches!(self, VectorKind::Output)
    }

    /// Short lowercase name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            VectorKind::Wire => "wire",
            VectorKind::Input => "input",
            VectorKind::Output => "output",
            VectorKind::Const { .. } => "const",
            VectorKind::Register => "register",
        }
    }

    /// One-letter tag used when rendering nets.
    pub(crate) fn tag(&self) -> char {
        match self {
            VectorKind::Wire => 'W',
            VectorKind::Input => 'I',
            VectorKind::Output => 'O',
            VectorKind::Const { .. } => 'C',
            VectorKind::Register => 'R',
        }
    }
}

/// Handle to a bit-vector registered in a block.
///
/// Handles are only created by the owning [`Block`](crate::block::Block) and
/// are checked against it whenever they are used to build a net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vector {
    id: VectorId,
    width: u32,
    block: BlockId,
}

impl Vector {
    pub(crate) fn new(id: VectorId, width: u32, block: BlockId) -> Self {
        Vector { id, width, block }
    }

    pub fn id(&self) -> VectorId {
        self.id
    }

    /// Number of bits carried by this vector.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The block that owns this vector.
    pub fn block(&self) -> BlockId {
        self.block
    }
}

/// Per-vector metadata stored in the block arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorInfo {
    pub name: String,
    pub width: u32,
    pub kind: VectorKind,
}

/// Number of bits needed to represent `value` (at least 1).
pub fn min_width(value: u64) -> u32 {
    (64 - value.leading_zeros()).max(1)
}

/// Returns `true` if `value` is representable in `width` bits.
pub fn fits_in(value: u64, width: u32) -> bool {
    width >= 64 || value >> width == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_per_kind() {
        assert!(VectorKind::Wire.is_drivable());
        assert!(!VectorKind::Input.is_drivable());
        assert!(!VectorKind::Const { value: 3 }.is_drivable());
        assert!(VectorKind::Register.is_drivable());
        assert!(VectorKind::Register.is_stateful());
        assert!(!VectorKind::Wire.is_stateful());
        assert!(!VectorKind::Output.is_readable());
        assert!(VectorKind::Input.is_readable());
    }

    #[test]
    fn min_width_of_values() {
        assert_eq!(min_width(0), 1);
        assert_eq!(min_width(1), 1);
        assert_eq!(min_width(5), 3);
        assert_eq!(min_width(255), 8);
        assert_eq!(min_width(u64::MAX), 64);
    }

    #[test]
    fn fits_in_width() {
        assert!(fits_in(7, 3));
        assert!(!fits_in(8, 3));
        assert!(fits_in(u64::MAX, 64));
        assert!(fits_in(0, 1));
    }
}
