//! Per-cycle value traces.
//!
//! When [`SimConfig::trace_enabled`](crate::sim::SimConfig::trace_enabled) is
//! set, every [`Simulation::step`](crate::sim::Simulation::step) records the
//! value of every named vector after combinational evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Values observed during one cycle, keyed by vector name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub cycle: u64,
    pub values: BTreeMap<String, u64>,
}

impl TraceEntry {
    pub fn value(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }
}
