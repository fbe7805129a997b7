//! Construction helpers on [`Block`].
//!
//! Each helper allocates its result vector, emits one or more nets through
//! [`Block::add_net`] and returns the new handle. Operands of equal-width ops
//! are zero-extended to a common width first, so callers only have to get
//! the widths of destinations right.
//!
//! A helper that fails leaves the block as it found it: any extensions or
//! result vectors it allocated are rolled back.

use crate::block::Block;
use crate::error::RtlError;
use crate::id::NetId;
use crate::net::LogicNet;
use crate::ops::{Op, OpParam};
use crate::vector::{Vector, VectorKind};

impl Block {
    /// Zero-extends `v` to `width` bits. Returns `v` itself if it is already
    /// that wide; narrowing is an error.
    pub fn zero_extend(&mut self, v: Vector, width: u32) -> Result<Vector, RtlError> {
        if v.width() == width {
            return Ok(v);
        }
        if v.width() > width {
            return Err(RtlError::InvalidWidth {
                context: format!("zero extension of '{}' ({} bits)", self.name_of(v), v.width()),
                width,
            });
        }
        self.atomically(|b| {
            let zeros = b.constant(0, width - v.width())?;
            b.concat(&[zeros, v])
        })
    }

    fn match_widths(&mut self, a: Vector, b: Vector) -> Result<(Vector, Vector), RtlError> {
        let width = a.width().max(b.width());
        Ok((self.zero_extend(a, width)?, self.zero_extend(b, width)?))
    }

    fn binary(&mut self, op: Op, a: Vector, b: Vector) -> Result<Vector, RtlError> {
        let operand = a.width().max(b.width());
        let width = match op {
            Op::Add | Op::Sub => operand.checked_add(1),
            Op::Mul => operand.checked_mul(2),
            Op::Eq => Some(1),
            _ => Some(operand),
        }
        .ok_or_else(|| RtlError::InvalidWidth {
            context: format!("result of '{}' exceeds u32 bits", op.symbol()),
            width: operand,
        })?;
        self.atomically(|blk| {
            let (a, b) = blk.match_widths(a, b)?;
            let out = blk.wire(width)?;
            blk.add_net(LogicNet::new(op, OpParam::None, [a, b], [out]))?;
            Ok(out)
        })
    }

    pub fn and(&mut self, a: Vector, b: Vector) -> Result<Vector, RtlError> {
        self.binary(Op::And, a, b)
    }

    pub fn or(&mut self, a: Vector, b: Vector) -> Result<Vector, RtlError> {
        self.binary(Op::Or, a, b)
    }

    pub fn xor(&mut self, a: Vector, b: Vector) -> Result<Vector, RtlError> {
        self.binary(Op::Xor, a, b)
    }

    /// Sum, one bit wider than the wider operand.
    pub fn add(&mut self, a: Vector, b: Vector) -> Result<Vector, RtlError> {
        self.binary(Op::Add, a, b)
    }

    /// Difference modulo 2^(w+1), where w is the wider operand's width.
    pub fn sub(&mut self, a: Vector, b: Vector) -> Result<Vector, RtlError> {
        self.binary(Op::Sub, a, b)
    }

    /// Product, twice as wide as the wider operand.
    pub fn mul(&mut self, a: Vector, b: Vector) -> Result<Vector, RtlError> {
        self.binary(Op::Mul, a, b)
    }

    /// One-bit equality test.
    pub fn eq(&mut self, a: Vector, b: Vector) -> Result<Vector, RtlError> {
        self.binary(Op::Eq, a, b)
    }

    pub fn not(&mut self, a: Vector) -> Result<Vector, RtlError> {
        self.atomically(|b| {
            let out = b.wire(a.width())?;
            b.add_net(LogicNet::new(Op::Not, OpParam::None, [a], [out]))?;
            Ok(out)
        })
    }

    /// `truecase` when `sel` is 1, else `falsecase`. Cases are zero-extended
    /// to a common width; `sel` must be a single bit.
    pub fn mux(
        &mut self,
        sel: Vector,
        falsecase: Vector,
        truecase: Vector,
    ) -> Result<Vector, RtlError> {
        if sel.width() != 1 {
            return Err(RtlError::WidthMismatch {
                context: format!("mux select '{}'", self.name_of(sel)),
                expected: 1,
                got: sel.width(),
            });
        }
        self.atomically(|b| {
            let (f, t) = b.match_widths(falsecase, truecase)?;
            let out = b.wire(f.width())?;
            b.add_net(LogicNet::new(Op::Mux, OpParam::None, [sel, f, t], [out]))?;
            Ok(out)
        })
    }

    /// Concatenates `parts`, the first one landing in the most significant
    /// bits.
    pub fn concat(&mut self, parts: &[Vector]) -> Result<Vector, RtlError> {
        let width = parts
            .iter()
            .try_fold(0u32, |acc, v| acc.checked_add(v.width()))
            .ok_or_else(|| RtlError::InvalidWidth {
                context: format!("concatenation of {} vectors exceeds u32 bits", parts.len()),
                width: u32::MAX,
            })?;
        self.atomically(|b| {
            let out = b.add_vector(None, width.max(1), VectorKind::Wire)?;
            b.add_net(LogicNet::new(
                Op::Concat,
                OpParam::None,
                parts.iter().copied(),
                [out],
            ))?;
            Ok(out)
        })
    }

    /// Selects bits of `v` by index; `bits[0]` becomes the result's LSB.
    pub fn select_bits(&mut self, v: Vector, bits: &[u32]) -> Result<Vector, RtlError> {
        self.atomically(|b| {
            let out = b.add_vector(None, (bits.len() as u32).max(1), VectorKind::Wire)?;
            b.add_net(LogicNet::new(
                Op::Select,
                OpParam::Bits(bits.to_vec()),
                [v],
                [out],
            ))?;
            Ok(out)
        })
    }

    /// A single bit of `v`.
    pub fn bit(&mut self, v: Vector, index: u32) -> Result<Vector, RtlError> {
        self.select_bits(v, &[index])
    }

    fn check_connection(&mut self, dest: Vector, src: Vector) -> Result<Vector, RtlError> {
        let name = self.check_member(dest)?.name.clone();
        if src.width() > dest.width() {
            return Err(RtlError::WidthMismatch {
                context: format!("connection to '{}'", name),
                expected: dest.width(),
                got: src.width(),
            });
        }
        self.zero_extend(src, dest.width())
    }

    /// Drives `dest` (a wire or output) from `src` unconditionally.
    pub fn connect(&mut self, dest: Vector, src: Vector) -> Result<NetId, RtlError> {
        self.atomically(|b| {
            let src = b.check_connection(dest, src)?;
            b.add_net(LogicNet::new(Op::Wire, OpParam::None, [src], [dest]))
        })
    }

    /// Sets the value `reg` takes on the next clock edge.
    pub fn connect_next(&mut self, reg: Vector, src: Vector) -> Result<NetId, RtlError> {
        self.atomically(|b| {
            let src = b.check_connection(reg, src)?;
            b.add_net(LogicNet::new(Op::Register, OpParam::None, [src], [reg]))
        })
    }

    fn reduce_bits(&mut self, op: Op, v: Vector) -> Result<Vector, RtlError> {
        if v.width() == 1 {
            return Ok(v);
        }
        self.atomically(|b| {
            let mut acc = b.bit(v, 0)?;
            for i in 1..v.width() {
                let next = b.bit(v, i)?;
                acc = b.binary(op, acc, next)?;
            }
            Ok(acc)
        })
    }

    /// One bit: 1 iff every bit of `v` is 1.
    pub fn and_all_bits(&mut self, v: Vector) -> Result<Vector, RtlError> {
        self.reduce_bits(Op::And, v)
    }

    /// One bit: 1 iff any bit of `v` is 1.
    pub fn or_all_bits(&mut self, v: Vector) -> Result<Vector, RtlError> {
        self.reduce_bits(Op::Or, v)
    }

    pub fn xor_all_bits(&mut self, v: Vector) -> Result<Vector, RtlError> {
        self.reduce_bits(Op::Xor, v)
    }

    /// Even-parity bit of `v` (the XOR of all its bits).
    pub fn parity(&mut self, v: Vector) -> Result<Vector, RtlError> {
        self.xor_all_bits(v)
    }
}
