//! Error types for rtlkit-core.
//!
//! Uses `thiserror` for structured, matchable variants. Every variant except
//! [`RtlError::Internal`] is a user error: a recoverable misuse of the
//! construction API that names the offending vector, memory or width.
//! `Internal` marks a broken compiler invariant and should never be
//! swallowed by callers.

use crate::id::MemId;
use thiserror::Error;

/// Errors produced while building or checking a netlist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtlError {
    /// Two vectors (or two memories) share a name.
    #[error("duplicate name: '{name}'")]
    DuplicateName { name: String },

    /// A net references a vector that is not registered in the block.
    #[error("unknown vector: '{name}'")]
    UnknownVector { name: String },

    /// A handle from another block was used.
    #[error("vector '{name}' belongs to a different block")]
    ForeignVector { name: String },

    /// Vectors were registered but no net ever references them.
    #[error("vectors declared but never connected: {names:?}")]
    Unconnected { names: Vec<String> },

    /// A net failed op, arity or legality validation.
    #[error("invalid net: {reason}")]
    InvalidNet { reason: String },

    /// Operand or destination widths disagree.
    #[error("bitwidth mismatch for {context}: expected {expected}, got {got}")]
    WidthMismatch {
        context: String,
        expected: u32,
        got: u32,
    },

    /// A width is zero or a constant does not fit its width.
    #[error("invalid bitwidth {width} for {context}")]
    InvalidWidth { context: String, width: u32 },

    /// The vector already has a driving net.
    #[error("vector '{name}' is already driven")]
    AlreadyDriven { name: String },

    /// The vector's kind forbids driving it (inputs, constants) or forbids
    /// driving it this way (registers take `connect_next`).
    #[error("vector '{name}' of kind {kind} cannot be driven here")]
    NotDrivable { name: String, kind: &'static str },

    /// Outputs are terminal and cannot feed other nets.
    #[error("vector '{name}' of kind {kind} cannot be read")]
    NotReadable { name: String, kind: &'static str },

    /// A conditional block was opened inside another one.
    #[error("no nesting of conditional assignments allowed")]
    NestedConditional,

    /// A conditional operation was used with no conditional block open.
    #[error("conditional assignment only valid under a condition")]
    NotUnderCondition,

    /// More predicate scopes were exited than entered.
    #[error("unbalanced predicate scopes")]
    UnbalancedScope,

    /// A conditional assignment was recorded outside every predicate.
    #[error("conditional assignment to '{name}' is not guarded by any predicate")]
    NoPredicate { name: String },

    /// Predicates must be single-bit vectors.
    #[error("predicate '{name}' must be 1 bit wide, got {width}")]
    PredicateWidth { name: String, width: u32 },

    /// Two assignments to the same destination cannot be proven exclusive.
    #[error("conflicting conditions for '{name}'")]
    ConflictingConditions { name: String },

    /// The vector cannot be the target of a conditional assignment.
    #[error("'{name}' of kind {kind} cannot be conditionally assigned")]
    InvalidDestination { name: String, kind: &'static str },

    /// A memory id is not known to the block.
    #[error("memory not found: MemId({id})")]
    MemoryNotFound { id: MemId },

    /// Adding a port would exceed the memory's configured maximum.
    #[error("memory '{name}' already has the maximum of {limit} {kind} ports")]
    PortLimit {
        name: String,
        kind: &'static str,
        limit: usize,
    },

    /// A sync-only memory was addressed by something other than a register.
    #[error("memory '{name}' is sync-only; address '{addr}' must be a register")]
    SyncOnlyAddress { name: String, addr: String },

    /// Writes to a ROM.
    #[error("memory '{name}' is read-only")]
    ReadOnlyMemory { name: String },

    /// ROM contents could not produce a valid value for an address.
    #[error("rom '{name}': {reason}")]
    RomAccess { name: String, reason: String },

    /// A broken compiler invariant.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl RtlError {
    /// Returns `true` for errors that indicate a bug in rtlkit itself rather
    /// than a misuse by the caller.
    pub fn is_internal(&self) -> bool {
        matches!(self, RtlError::Internal { .. })
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        RtlError::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_internal_is_internal() {
        assert!(RtlError::internal("broken").is_internal());
        assert!(!RtlError::NestedConditional.is_internal());
        assert!(!RtlError::ConflictingConditions { name: "w".into() }.is_internal());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = RtlError::WidthMismatch {
            context: "write data of memory 'ram'".into(),
            expected: 8,
            got: 9,
        };
        assert_eq!(
            err.to_string(),
            "bitwidth mismatch for write data of memory 'ram': expected 8, got 9"
        );
        assert_eq!(
            RtlError::MemoryNotFound { id: MemId(4) }.to_string(),
            "memory not found: MemId(4)"
        );
    }
}
