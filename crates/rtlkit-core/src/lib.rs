//! Netlist intermediate representation for hardware construction.
//!
//! A [`Block`] owns typed bit-vectors, logic nets and memories. Designs are
//! built through the helper methods on `Block`; predicated assignments are
//! recorded inside a conditional scope and lowered to multiplexer chains
//! when the scope closes.

pub mod id;
pub mod error;
pub mod vector;
pub mod ops;
pub mod net;
pub mod block;
pub mod build;
pub mod memory;
pub mod conditional;

// Re-export commonly used types
pub use block::{Block, NetGraph};
pub use conditional::{Assignment, Destination, Polarity, PredicateSet, ScopeEntry};
pub use error::RtlError;
pub use id::{BlockId, MemId, NetId, VectorId};
pub use memory::{MemConfig, Memory, RomData};
pub use net::LogicNet;
pub use ops::{Op, OpParam};
pub use vector::{Vector, VectorInfo, VectorKind};
