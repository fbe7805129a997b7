//! Operation tags for logic nets.
//!
//! The tag set is closed: every net in a block carries exactly one [`Op`].
//! Tags do not carry widths; widths come from the vectors wired to the net
//! and are validated when the net is added to a block.
//!
//! | Op | Symbol | Inputs | Output width |
//! |---|---|---|---|
//! | `Wire` | `w` | 1 | same as input |
//! | `Not` | `~` | 1 | same as input |
//! | `And`/`Or`/`Xor` | `&` `\|` `^` | 2, equal widths | same as inputs |
//! | `Add`/`Sub` | `+` `-` | 2, equal widths | input + 1 |
//! | `Mul` | `*` | 2, equal widths | 2 × input |
//! | `Eq` | `=` | 2, equal widths | 1 |
//! | `Mux` | `x` | select, false, true | same as cases |
//! | `Concat` | `c` | 1 or more, MSB first | sum of inputs |
//! | `Select` | `s` | 1 | number of selected bits |
//! | `Register` | `r` | 1 | same as input |
//! | `MemRead` | `m` | address | memory bitwidth |
//! | `MemWrite` | `@` | address, data, enable | no outputs |

use serde::{Deserialize, Serialize};

use crate::id::MemId;

/// Operation performed by a logic net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    /// Directional pass-through with no logic function.
    Wire,
    Not,
    And,
    Or,
    Xor,
    Add,
    Sub,
    Mul,
    /// Equality comparison producing a single bit.
    Eq,
    /// Two-way multiplexer: inputs are (select, false case, true case).
    Mux,
    /// Concatenation; the first input lands in the most significant bits.
    Concat,
    /// Bit selection by explicit index list; repeats are allowed.
    Select,
    /// On the clock edge, copies the input to the output.
    Register,
    /// Asynchronous memory read port.
    MemRead,
    /// Synchronous memory write port.
    MemWrite,
}

/// Number of inputs a net of a given op accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl Op {
    /// Every op tag, in declaration order.
    pub const ALL: [Op; 15] = [
        Op::Wire,
        Op::Not,
        Op::And,
        Op::Or,
        Op::Xor,
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Eq,
        Op::Mux,
        Op::Concat,
        Op::Select,
        Op::Register,
        Op::MemRead,
        Op::MemWrite,
    ];

    /// Single-character symbol used when rendering nets.
    pub fn symbol(&self) -> char {
        match self {
            Op::Wire => 'w',
            Op::Not => '~',
            Op::And => '&',
            Op::Or => '|',
            Op::Xor => '^',
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Eq => '=',
            Op::Mux => 'x',
            Op::Concat => 'c',
            Op::Select => 's',
            Op::Register => 'r',
            Op::MemRead => 'm',
            Op::MemWrite => '@',
        }
    }

    /// Returns `true` for ops whose operands must all share one width.
    pub fn requires_equal_widths(&self) -> bool {
        matches!(
            self,
            Op::And | Op::Or | Op::Xor | Op::Add | Op::Sub | Op::Mul | Op::Eq
        )
    }

    /// Returns `true` for ops that reference a memory through their param.
    pub fn is_memory(&self) -> bool {
        matches!(self, Op::MemRead | Op::MemWrite)
    }

    /// Returns `true` for ops whose effect is latched on the clock edge.
    pub fn is_stateful(&self) -> bool {
        matches!(self, Op::Register | Op::MemWrite)
    }

    pub fn arity(&self) -> Arity {
        match self {
            Op::Wire | Op::Not | Op::Select | Op::Register | Op::MemRead => Arity::Exact(1),
            Op::And | Op::Or | Op::Xor | Op::Add | Op::Sub | Op::Mul | Op::Eq => Arity::Exact(2),
            Op::Mux | Op::MemWrite => Arity::Exact(3),
            Op::Concat => Arity::AtLeast(1),
        }
    }

    /// Number of output vectors a net of this op drives.
    pub fn output_count(&self) -> usize {
        match self {
            Op::MemWrite => 0,
            _ => 1,
        }
    }
}

/// Tag-specific metadata attached to a net.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpParam {
    None,
    /// Bit indices taken by a `Select` net, least significant output bit first.
    Bits(Vec<u32>),
    /// Memory targeted by a `MemRead` or `MemWrite` net.
    Memory(MemId),
}
