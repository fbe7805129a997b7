//! Simulation error types.
//!
//! Construction-time problems (an invalid or unsupported design) and
//! per-cycle problems (bad stimulus, ROM access failures) share one enum.
//! Errors raised by the netlist itself are wrapped in
//! [`SimError::InvalidDesign`].

use rtlkit_core::{NetId, RtlError};

/// Errors produced by the reference evaluator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("invalid design: {0}")]
    InvalidDesign(#[from] RtlError),

    #[error("cannot simulate while a conditional scope is open")]
    ConditionalOpen,

    #[error("'{name}' is {width} bits wide; at most 64 bits are supported")]
    UnsupportedWidth { name: String, width: u32 },

    #[error("combinational loop through net {net}")]
    CombinationalLoop { net: NetId },

    #[error("no value supplied for input '{name}'")]
    MissingInput { name: String },

    #[error("value {value} does not fit input '{name}' of {width} bits")]
    ValueTooWide { name: String, value: u64, width: u32 },

    #[error("unknown input: '{name}'")]
    UnknownInput { name: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}
