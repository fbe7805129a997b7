//! The immutable logic net record.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::ops::{Op, OpParam};
use crate::vector::Vector;

/// Inputs of a net, in port order.
pub type NetArgs = SmallVec<[Vector; 3]>;
/// Outputs of a net. Only `MemWrite` has none.
pub type NetDests = SmallVec<[Vector; 1]>;

/// One primitive unit of logic: `(op, param, args, dests)`.
///
/// Nets are never mutated once added to a block; passes that transform a
/// design build new nets in a new block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicNet {
    pub op: Op,
    pub param: OpParam,
    pub args: NetArgs,
    pub dests: NetDests,
}

impl LogicNet {
    pub fn new(
        op: Op,
        param: OpParam,
        args: impl IntoIterator<Item = Vector>,
        dests: impl IntoIterator<Item = Vector>,
    ) -> Self {
        LogicNet {
            op,
            param,
            args: args.into_iter().collect(),
            dests: dests.into_iter().collect(),
        }
    }

    /// Every vector this net touches, inputs first.
    pub fn vectors(&self) -> impl Iterator<Item = &Vector> {
        self.args.iter().chain(self.dests.iter())
    }

    /// The single output of a net, if it has one.
    pub fn dest(&self) -> Option<Vector> {
        self.dests.first().copied()
    }
}
