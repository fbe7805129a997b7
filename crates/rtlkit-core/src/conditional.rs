//! Conditional assignment: predicated writes lowered to multiplexer chains.
//!
//! While a conditional scope is open, assignments are not turned into nets
//! directly. Each one is recorded per destination together with the
//! *effective predicate* of its position in the scope stack. When the scope
//! closes, every destination is finalized exactly once:
//!
//! - wires fold their records into `mux(p, acc, value)` starting from the
//!   supplied default or constant 0;
//! - registers fold the same way starting from their default or their own
//!   current value (hold);
//! - memories merge all recorded writes into a single write port, each field
//!   selected per predicate.
//!
//! Records are folded in recording order, so the last record is the
//! outermost test of the chain and wins when its predicate holds.
//!
//! # Scope stack
//!
//! The stack holds one frame per nesting level. Entering a predicate appends
//! it to the innermost frame and pushes an empty frame for its children.
//! Consecutive predicates in a frame form an if/elif chain: each one is
//! implicitly guarded by the negation of the earlier ones, back to the most
//! recent [`ScopeEntry::Otherwise`], which starts a fresh chain.
//!
//! ```text
//! when(a)      { x = 1; when(b) { x = 3 } }   // {a}, {a, b}
//! otherwise    { x = 5 }                      // {!a}
//! ```
//!
//! # Conflicts
//!
//! A record is accepted for a destination only if, against every earlier
//! record for it, the two predicate sets are mutually exclusive (some
//! predicate appears with opposite polarity) or the earlier set is a strict
//! subset of the new one. The second case is a refinement nested inside the
//! earlier branch; it is recorded later and therefore takes priority.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;

use crate::block::{Block, Checkpoint};
use crate::error::RtlError;
use crate::id::{MemId, VectorId};
use crate::vector::{Vector, VectorKind};

/// One entry of a scope frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEntry {
    /// A one-bit predicate.
    Predicate(Vector),
    /// Taken when no earlier predicate of the same chain holds.
    Otherwise,
}

/// Whether a predicate must be 1 (`Asserted`) or 0 (`Negated`) for its
/// term to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Polarity {
    Asserted,
    Negated,
}

/// The predicates (and their polarities) that guard one assignment.
pub type PredicateSet = BTreeSet<(VectorId, Polarity)>;

/// The target of a conditional assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// A wire or output, defaulting to 0.
    Wire(Vector),
    /// The next value of a register, defaulting to its current value.
    Register(Vector),
    /// A write port of a memory.
    Memory(MemId),
}

/// The value recorded for a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Value(Vector),
    Write {
        addr: Vector,
        data: Vector,
        enable: Vector,
    },
}

/// Returns `true` if some predicate appears with opposite polarity in the
/// two sets, so that at most one of them can hold in any cycle.
pub fn mutually_exclusive(a: &PredicateSet, b: &PredicateSet) -> bool {
    a.iter().any(|&(pred, polarity)| {
        let opposite = match polarity {
            Polarity::Asserted => Polarity::Negated,
            Polarity::Negated => Polarity::Asserted,
        };
        b.contains(&(pred, opposite))
    })
}

/// Returns `true` if `later` may be recorded after `earlier` for the same
/// destination.
///
/// Beyond mutual exclusion this also accepts a strict refinement: `later`
/// guarded by every predicate of `earlier` plus more. A purely exclusive rule
/// would reject an assignment nested inside a branch that already assigned
/// the same destination. The reverse order stays a conflict, since the
/// broader record would be folded outermost and mask the narrower one.
pub fn compatible(earlier: &PredicateSet, later: &PredicateSet) -> bool {
    mutually_exclusive(earlier, later) || (earlier.len() < later.len() && earlier.is_subset(later))
}

/// State of an open conditional scope.
#[derive(Debug)]
pub(crate) struct ConditionalState {
    stack: Vec<Vec<ScopeEntry>>,
    pending: IndexMap<Destination, Vec<(Vector, Assignment)>>,
    conflicts: HashMap<Destination, Vec<PredicateSet>>,
    /// Block contents when the scope opened; restored if the scope fails.
    opened_at: Checkpoint,
}

impl ConditionalState {
    fn new(opened_at: Checkpoint) -> Self {
        ConditionalState {
            opened_at,
            stack: vec![Vec::new()],
            pending: IndexMap::new(),
            conflicts: HashMap::new(),
        }
    }

    /// Predicate terms guarding the current position, outermost first.
    fn current_terms(&self) -> Vec<(Vector, Polarity)> {
        let mut terms = Vec::new();
        let Some((_, enclosing)) = self.stack.split_last() else {
            return terms;
        };
        for frame in enclosing {
            let Some((current, earlier)) = frame.split_last() else {
                continue;
            };
            let chain_start = earlier
                .iter()
                .rposition(|e| *e == ScopeEntry::Otherwise)
                .map_or(0, |i| i + 1);
            for entry in &earlier[chain_start..] {
                if let ScopeEntry::Predicate(p) = entry {
                    terms.push((*p, Polarity::Negated));
                }
            }
            if let ScopeEntry::Predicate(p) = current {
                terms.push((*p, Polarity::Asserted));
            }
        }
        terms
    }
}

impl Block {
    /// Returns `true` while a conditional scope is open.
    pub fn under_condition(&self) -> bool {
        self.conditional.is_some()
    }

    fn conditional_state(&mut self) -> Result<&mut ConditionalState, RtlError> {
        self.conditional
            .as_mut()
            .ok_or(RtlError::NotUnderCondition)
    }

    pub fn open_conditional(&mut self) -> Result<(), RtlError> {
        if self.conditional.is_some() {
            return Err(RtlError::NestedConditional);
        }
        self.conditional = Some(ConditionalState::new(self.checkpoint()));
        tracing::debug!(block = %self.id(), "opened conditional scope");
        Ok(())
    }

    /// Enters a predicate (or `otherwise`) scope inside the open conditional.
    pub fn enter_predicate(&mut self, entry: ScopeEntry) -> Result<(), RtlError> {
        if !self.under_condition() {
            return Err(RtlError::NotUnderCondition);
        }
        if let ScopeEntry::Predicate(p) = entry {
            let info = self.check_readable(p)?;
            if p.width() != 1 {
                return Err(RtlError::PredicateWidth {
                    name: info.name.clone(),
                    width: p.width(),
                });
            }
        }
        let state = self.conditional_state()?;
        if let Some(frame) = state.stack.last_mut() {
            frame.push(entry);
        }
        state.stack.push(Vec::new());
        Ok(())
    }

    pub fn exit_predicate(&mut self) -> Result<(), RtlError> {
        let state = self.conditional_state()?;
        if state.stack.len() <= 1 {
            return Err(RtlError::UnbalancedScope);
        }
        state.stack.pop();
        Ok(())
    }

    /// Records `dest = value` under the current predicate.
    ///
    /// `dest` may be a wire, an output or a register (whose next value is
    /// assigned). A narrower `value` is zero-extended.
    pub fn assign_when(&mut self, dest: Vector, value: Vector) -> Result<(), RtlError> {
        if !self.under_condition() {
            return Err(RtlError::NotUnderCondition);
        }
        let info = self.check_member(dest)?;
        let destination = match info.kind {
            VectorKind::Wire | VectorKind::Output => Destination::Wire(dest),
            VectorKind::Register => Destination::Register(dest),
            kind => {
                return Err(RtlError::InvalidDestination {
                    name: info.name.clone(),
                    kind: kind.name(),
                })
            }
        };
        if value.width() > dest.width() {
            return Err(RtlError::WidthMismatch {
                context: format!("conditional assignment to '{}'", info.name),
                expected: dest.width(),
                got: value.width(),
            });
        }
        self.check_readable(value)?;
        self.atomically(|b| {
            let value = b.zero_extend(value, dest.width())?;
            b.record(destination, Assignment::Value(value))
        })
    }

    fn destination_name(&self, dest: Destination) -> String {
        match dest {
            Destination::Wire(v) | Destination::Register(v) => self.name_of(v),
            Destination::Memory(id) => match self.memory(id) {
                Some(mem) => mem.name().to_string(),
                None => format!("memory {}", id),
            },
        }
    }

    /// Records an assignment under the current effective predicate.
    pub(crate) fn record(
        &mut self,
        dest: Destination,
        assignment: Assignment,
    ) -> Result<(), RtlError> {
        let state = self
            .conditional
            .as_ref()
            .ok_or(RtlError::NotUnderCondition)?;
        let terms = state.current_terms();
        if terms.is_empty() {
            return Err(RtlError::NoPredicate {
                name: self.destination_name(dest),
            });
        }

        let pred_set: PredicateSet = terms.iter().map(|(v, pol)| (v.id(), *pol)).collect();
        if let Some(prior) = state.conflicts.get(&dest) {
            if !prior.iter().all(|earlier| compatible(earlier, &pred_set)) {
                return Err(RtlError::ConflictingConditions {
                    name: self.destination_name(dest),
                });
            }
        }

        let mut predicate: Option<Vector> = None;
        for (p, polarity) in terms {
            let term = match polarity {
                Polarity::Asserted => p,
                Polarity::Negated => self.not(p)?,
            };
            predicate = Some(match predicate {
                Some(acc) => self.and(acc, term)?,
                None => term,
            });
        }
        let predicate = predicate.ok_or_else(|| RtlError::internal("empty predicate"))?;
        if predicate.width() != 1 {
            return Err(RtlError::internal(format!(
                "effective predicate is {} bits wide",
                predicate.width()
            )));
        }

        tracing::trace!(
            destination = %self.destination_name(dest),
            terms = pred_set.len(),
            "recorded conditional assignment"
        );
        let state = self.conditional_state()?;
        state.conflicts.entry(dest).or_default().push(pred_set);
        state
            .pending
            .entry(dest)
            .or_default()
            .push((predicate, assignment));
        Ok(())
    }

    /// Closes the open conditional scope and finalizes every destination.
    ///
    /// `defaults` maps wires and registers to the value they take when none
    /// of their assignments apply. The scope is discarded whether or not
    /// finalization succeeds; on failure the block is restored to its
    /// contents from before the scope opened.
    pub fn close_conditional(&mut self, defaults: &[(Vector, Vector)]) -> Result<(), RtlError> {
        let state = self
            .conditional
            .take()
            .ok_or(RtlError::NotUnderCondition)?;
        let opened_at = state.opened_at;
        if state.stack.len() != 1 {
            self.rollback(opened_at);
            return Err(RtlError::UnbalancedScope);
        }
        tracing::debug!(
            block = %self.id(),
            destinations = state.pending.len(),
            "closing conditional scope"
        );
        let result = self.finalize(state, defaults);
        if result.is_err() {
            self.rollback(opened_at);
        }
        result
    }

    /// Abandons the open scope, if any, and everything built inside it.
    fn discard_conditional(&mut self) {
        if let Some(state) = self.conditional.take() {
            tracing::debug!(block = %self.id(), "discarding conditional scope");
            self.rollback(state.opened_at);
        }
    }

    fn finalize(
        &mut self,
        state: ConditionalState,
        defaults: &[(Vector, Vector)],
    ) -> Result<(), RtlError> {
        let mut default_of = HashMap::new();
        for &(dest, default) in defaults {
            let name = self.check_member(dest)?.name.clone();
            self.check_readable(default)?;
            if default.width() > dest.width() {
                return Err(RtlError::WidthMismatch {
                    context: format!("default of '{}'", name),
                    expected: dest.width(),
                    got: default.width(),
                });
            }
            default_of.insert(dest.id(), default);
        }

        for (dest, records) in state.pending {
            tracing::debug!(
                destination = %self.destination_name(dest),
                assignments = records.len(),
                "finalizing destination"
            );
            match dest {
                Destination::Memory(mem) => self.finalize_memory(mem, &records)?,
                Destination::Register(reg) => {
                    let base = default_of.get(&reg.id()).copied().unwrap_or(reg);
                    let next = self.fold_values(base, &records)?;
                    self.connect_next(reg, next)?;
                }
                Destination::Wire(wire) => {
                    let base = match default_of.get(&wire.id()) {
                        Some(&default) => default,
                        None => self.constant(0, wire.width())?,
                    };
                    let value = self.fold_values(base, &records)?;
                    self.connect(wire, value)?;
                }
            }
        }
        Ok(())
    }

    fn fold_values(
        &mut self,
        base: Vector,
        records: &[(Vector, Assignment)],
    ) -> Result<Vector, RtlError> {
        let mut acc = base;
        for &(predicate, assignment) in records {
            let Assignment::Value(value) = assignment else {
                return Err(RtlError::internal("memory write recorded for a vector"));
            };
            acc = self.mux(predicate, acc, value)?;
        }
        Ok(acc)
    }

    fn finalize_memory(
        &mut self,
        mem: MemId,
        records: &[(Vector, Assignment)],
    ) -> Result<(), RtlError> {
        let mut merged: Option<(Vector, Vector, Vector)> = None;
        for &(predicate, assignment) in records {
            let Assignment::Write { addr, data, enable } = assignment else {
                return Err(RtlError::internal("value assignment recorded for a memory"));
            };
            merged = Some(match merged {
                None => {
                    let off = self.constant(0, 1)?;
                    (addr, data, self.mux(predicate, off, enable)?)
                }
                Some((acc_addr, acc_data, acc_enable)) => (
                    self.mux(predicate, acc_addr, addr)?,
                    self.mux(predicate, acc_data, data)?,
                    self.mux(predicate, acc_enable, enable)?,
                ),
            });
        }
        let (addr, data, enable) =
            merged.ok_or_else(|| RtlError::internal("memory destination without writes"))?;
        self.build_write_port(mem, addr, data, enable)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scoped API
    // -----------------------------------------------------------------------

    /// Runs `body` inside a conditional scope and finalizes it.
    ///
    /// If `body` fails the scope is discarded, along with every vector and
    /// net built inside it, and the body's error is returned.
    pub fn conditional<R>(
        &mut self,
        defaults: &[(Vector, Vector)],
        body: impl FnOnce(&mut Block) -> Result<R, RtlError>,
    ) -> Result<R, RtlError> {
        self.open_conditional()?;
        let value = match body(self) {
            Ok(value) => value,
            Err(err) => {
                self.discard_conditional();
                return Err(err);
            }
        };
        self.close_conditional(defaults)?;
        Ok(value)
    }

    /// Runs `body` under `pred`. Must be called inside [`conditional`](Self::conditional).
    pub fn when<R>(
        &mut self,
        pred: Vector,
        body: impl FnOnce(&mut Block) -> Result<R, RtlError>,
    ) -> Result<R, RtlError> {
        self.scoped(ScopeEntry::Predicate(pred), body)
    }

    /// Runs `body` when none of the preceding sibling predicates hold.
    pub fn otherwise<R>(
        &mut self,
        body: impl FnOnce(&mut Block) -> Result<R, RtlError>,
    ) -> Result<R, RtlError> {
        self.scoped(ScopeEntry::Otherwise, body)
    }

    fn scoped<R>(
        &mut self,
        entry: ScopeEntry,
        body: impl FnOnce(&mut Block) -> Result<R, RtlError>,
    ) -> Result<R, RtlError> {
        self.enter_predicate(entry)?;
        let result = body(self);
        let exited = self.exit_predicate();
        let value = result?;
        exited?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Op;
    use proptest::prelude::*;

    fn set(items: &[(u32, Polarity)]) -> PredicateSet {
        items.iter().map(|&(id, pol)| (VectorId(id), pol)).collect()
    }

    #[test]
    fn exclusivity_and_refinement() {
        use Polarity::*;
        let a = set(&[(0, Asserted)]);
        let not_a = set(&[(0, Negated)]);
        let a_b = set(&[(0, Asserted), (1, Asserted)]);
        let b = set(&[(1, Asserted)]);

        assert!(mutually_exclusive(&a, &not_a));
        assert!(!mutually_exclusive(&a, &b));
        assert!(compatible(&a, &a_b));
        assert!(!compatible(&a_b, &a));
        assert!(!compatible(&a, &a));
        assert!(!compatible(&a, &b));
    }

    #[test]
    fn nested_conditional_is_rejected() {
        let mut block = Block::new();
        block.open_conditional().unwrap();
        assert_eq!(block.open_conditional(), Err(RtlError::NestedConditional));
    }

    #[test]
    fn scope_operations_require_open_conditional() {
        let mut block = Block::new();
        let p = block.input("p", 1).unwrap();
        let w = block.wire(1).unwrap();
        assert_eq!(
            block.enter_predicate(ScopeEntry::Predicate(p)),
            Err(RtlError::NotUnderCondition)
        );
        assert_eq!(block.exit_predicate(), Err(RtlError::NotUnderCondition));
        assert_eq!(block.assign_when(w, p), Err(RtlError::NotUnderCondition));
        assert_eq!(block.close_conditional(&[]), Err(RtlError::NotUnderCondition));
    }

    #[test]
    fn predicates_must_be_one_bit() {
        let mut block = Block::new();
        let wide = block.input("wide", 2).unwrap();
        let err = block
            .conditional(&[], |b| b.when(wide, |_| Ok(())))
            .unwrap_err();
        assert_eq!(
            err,
            RtlError::PredicateWidth {
                name: "wide".into(),
                width: 2
            }
        );
        assert!(!block.under_condition());
    }

    #[test]
    fn assignment_outside_any_predicate_is_rejected() {
        let mut block = Block::new();
        let w = block.named_wire("w", 1).unwrap();
        let one = block.constant(1, 1).unwrap();
        let err = block
            .conditional(&[], |b| b.assign_when(w, one))
            .unwrap_err();
        assert_eq!(err, RtlError::NoPredicate { name: "w".into() });
    }

    #[test]
    fn inputs_are_not_destinations() {
        let mut block = Block::new();
        let p = block.input("p", 1).unwrap();
        let i = block.input("i", 1).unwrap();
        let err = block
            .conditional(&[], |b| b.when(p, |b| b.assign_when(i, p)))
            .unwrap_err();
        assert!(matches!(err, RtlError::InvalidDestination { kind: "input", .. }));
    }

    #[test]
    fn exclusive_siblings_do_not_conflict() {
        let mut block = Block::new();
        let p = block.input("p", 1).unwrap();
        let o = block.output("o", 2).unwrap();
        let one = block.constant(1, 2).unwrap();
        let two = block.constant(2, 2).unwrap();

        block
            .conditional(&[], |b| {
                b.when(p, |b| b.assign_when(o, one))?;
                b.otherwise(|b| b.assign_when(o, two))
            })
            .unwrap();

        block.sanity_check().unwrap();
        assert_eq!(block.net(block.driver_of(o).unwrap()).unwrap().op, Op::Wire);
    }

    #[test]
    fn same_branch_twice_conflicts() {
        let mut block = Block::new();
        let p = block.input("p", 1).unwrap();
        let w = block.named_wire("w", 1).unwrap();
        let err = block
            .conditional(&[], |b| {
                b.when(p, |b| {
                    b.assign_when(w, p)?;
                    b.assign_when(w, p)
                })
            })
            .unwrap_err();
        assert_eq!(err, RtlError::ConflictingConditions { name: "w".into() });
    }

    #[test]
    fn unrelated_predicates_conflict() {
        let mut block = Block::new();
        let a = block.input("a", 1).unwrap();
        let b_in = block.input("b", 1).unwrap();
        let w = block.named_wire("w", 1).unwrap();
        let err = block
            .conditional(&[], |b| {
                b.when(a, |b| b.assign_when(w, a))?;
                // `otherwise` ends the chain, so `b` is not guarded by `!a`.
                b.otherwise(|_| Ok(()))?;
                b.when(b_in, |b| b.assign_when(w, b_in))
            })
            .unwrap_err();
        assert_eq!(err, RtlError::ConflictingConditions { name: "w".into() });
    }

    #[test]
    fn nested_refinement_is_accepted_in_order_only() {
        let mut block = Block::new();
        let a = block.input("a", 1).unwrap();
        let b_in = block.input("b", 1).unwrap();
        let r = block.named_register("r", 2).unwrap();
        let one = block.constant(1, 2).unwrap();
        let three = block.constant(3, 2).unwrap();

        block
            .conditional(&[], |b| {
                b.when(a, |b| {
                    b.assign_when(r, one)?;
                    b.when(b_in, |b| b.assign_when(r, three))
                })
            })
            .unwrap();

        let mut other = Block::new();
        let a = other.input("a", 1).unwrap();
        let b_in = other.input("b", 1).unwrap();
        let r = other.named_register("r", 2).unwrap();
        let one = other.constant(1, 2).unwrap();
        let three = other.constant(3, 2).unwrap();
        let err = other
            .conditional(&[], |b| {
                b.when(a, |b| {
                    b.when(b_in, |b| b.assign_when(r, three))?;
                    b.assign_when(r, one)
                })
            })
            .unwrap_err();
        assert!(matches!(err, RtlError::ConflictingConditions { .. }));
    }

    #[test]
    fn state_is_reset_after_failed_close() {
        let mut block = Block::new();
        let p = block.input("p", 1).unwrap();
        let w = block.named_wire("w", 4).unwrap();
        let wide_default = block.input("d", 5).unwrap();

        block.open_conditional().unwrap();
        block.enter_predicate(ScopeEntry::Predicate(p)).unwrap();
        block.assign_when(w, p).unwrap();
        block.exit_predicate().unwrap();
        let err = block.close_conditional(&[(w, wide_default)]).unwrap_err();
        assert!(matches!(err, RtlError::WidthMismatch { .. }));
        assert!(!block.under_condition());
        assert_eq!(block.net_count(), 0);

        // A fresh scope starts with no pending records for `w`.
        block
            .conditional(&[], |b| b.when(p, |b| b.assign_when(w, p)))
            .unwrap();
    }

    #[test]
    fn closing_with_open_predicates_is_unbalanced() {
        let mut block = Block::new();
        let p = block.input("p", 1).unwrap();
        block.open_conditional().unwrap();
        block.enter_predicate(ScopeEntry::Predicate(p)).unwrap();
        assert_eq!(block.close_conditional(&[]), Err(RtlError::UnbalancedScope));
        assert!(!block.under_condition());
    }

    #[test]
    fn failing_body_discards_scope_and_emits_nothing() {
        let mut block = Block::new();
        let p = block.input("p", 1).unwrap();
        let w = block.named_wire("w", 1).unwrap();
        let (vectors, nets) = (block.vector_count(), block.net_count());
        let err = block
            .conditional(&[], |b| {
                let not_p = b.not(p)?;
                b.when(not_p, |b| b.assign_when(w, p))?;
                Err::<(), _>(RtlError::UnknownVector { name: "x".into() })
            })
            .unwrap_err();
        assert!(matches!(err, RtlError::UnknownVector { .. }));
        assert!(!block.under_condition());
        assert_eq!(block.driver_of(w), None);
        assert_eq!(block.vector_count(), vectors);
        assert_eq!(block.net_count(), nets);
    }

    #[test]
    fn conditional_memory_writes_merge_into_one_port() {
        use crate::memory::MemConfig;

        let mut block = Block::new();
        let ram = block.mem_block(Some("ram"), 8, 2, MemConfig::default()).unwrap();
        let p1 = block.input("p1", 1).unwrap();
        let p2 = block.input("p2", 1).unwrap();
        let a1 = block.input("a1", 2).unwrap();
        let a2 = block.input("a2", 2).unwrap();
        let d1 = block.input("d1", 8).unwrap();
        let d2 = block.input("d2", 8).unwrap();

        block
            .conditional(&[], |b| {
                b.when(p1, |b| b.mem_write(ram, a1, d1, None))?;
                b.when(p2, |b| b.mem_write(ram, a2, d2, None))
            })
            .unwrap();

        assert_eq!(block.memory(ram).unwrap().write_ports().len(), 1);
        block.sanity_check().unwrap();
    }

    proptest! {
        /// An if/elif chain of any length, with or without a trailing
        /// `otherwise`, never conflicts and always yields a sane block.
        #[test]
        fn sibling_chains_never_conflict(count in 1usize..8, with_otherwise: bool) {
            let mut block = Block::new();
            let preds: Vec<Vector> = (0..count)
                .map(|i| block.input(&format!("p{}", i), 1).unwrap())
                .collect();
            let out = block.output("out", 4).unwrap();
            let values: Vec<Vector> = (0..count)
                .map(|i| block.constant(i as u64, 4).unwrap())
                .collect();
            let fallback = block.constant(15, 4).unwrap();

            let result = block.conditional(&[], |b| {
                for (&p, &v) in preds.iter().zip(&values) {
                    b.when(p, |b| b.assign_when(out, v))?;
                }
                if with_otherwise {
                    b.otherwise(|b| b.assign_when(out, fallback))?;
                }
                Ok(())
            });
            prop_assert!(result.is_ok());
            if !with_otherwise {
                let spare = block.output("spare", 4).unwrap();
                block.connect(spare, fallback).unwrap();
            }
            prop_assert!(block.sanity_check().is_ok());
        }
    }
}
