//! Reference evaluator for rtlkit netlists.
//!
//! Steps a finalized [`Block`](rtlkit_core::Block) one clock cycle at a time.
//! Used to check that conditional assignments lower to the intended
//! behavior; it does not model timing.
//!
//! ```ignore
//! let mut sim = Simulation::new(&block, SimConfig::default())?;
//! sim.step([("a", 1), ("b", 0)])?;
//! assert_eq!(sim.inspect_by_name("out"), Some(1));
//! ```

pub mod error;
pub mod sim;
pub mod stimulus;
pub mod trace;

pub use error::SimError;
pub use sim::{SimConfig, Simulation};
pub use trace::TraceEntry;
