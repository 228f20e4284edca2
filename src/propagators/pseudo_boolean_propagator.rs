use crate::basic_types::{Literal, WeightedLiteral};
use crate::engine::Assignments;
use crate::marrow_assert_moderate;
use crate::marrow_assert_simple;

/// Selects how pseudo-Boolean constraints maintain their propagation state:
/// - the counter handler registers every term and keeps a running slack per constraint,
/// - the watched handler only registers a subset of terms whose coefficient sum exceeds the
///   threshold plus the maximum coefficient, in the style of the Pueblo solver.
///
/// Both handlers derive the same forced literals and report the same conflicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PbHandlerType {
    Counter,
    Watched,
}

impl std::fmt::Display for PbHandlerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PbHandlerType::Counter => write!(f, "counter"),
            PbHandlerType::Watched => write!(f, "watched"),
        }
    }
}

pub enum PropagationStatusPb {
    ConflictDetected { constraint_index: u32 },
    NoConflictDetected,
}

impl PropagationStatusPb {
    pub fn no_conflict(&self) -> bool {
        matches!(*self, PropagationStatusPb::NoConflictDetected)
    }
}

/// The outcome of attaching a constraint at the root level.
#[derive(Debug, PartialEq, Eq)]
pub enum PbConstraintAttachmentOutcome {
    Attached,
    RootConflict,
}

struct PseudoBooleanConstraint {
    terms: Vec<WeightedLiteral>, //sorted by decreasing weight
    rhs: u64,
    //counter handler state: the sum of the weights of non-falsified terms minus the threshold
    slack: i128,
    //watched handler state
    watched: Vec<bool>,
    watched_sum: i128, //the sum of the weights of non-falsified watched terms
}

impl PseudoBooleanConstraint {
    fn max_weight(&self) -> u64 {
        self.terms[0].weight
    }

    //the watched handler aims to keep this many units of watched weight available,
    //  as long as that holds no propagation nor conflict is possible
    fn watched_weight_target(&self) -> i128 {
        self.rhs as i128 + self.max_weight() as i128
    }
}

#[derive(Clone, Copy)]
struct PbWatcher {
    constraint_index: u32,
    term_index: u32,
}

/// Unit propagation for pseudo-Boolean constraints `sum of w_i * l_i >= rhs`. A term is woken
/// through the watch list of the literal that falsifies it. The propagator processes the trail
/// lazily, in lockstep with the clausal propagator, and reconstructs reasons on demand during
/// conflict analysis.
pub struct PseudoBooleanPropagator {
    constraints: Vec<PseudoBooleanConstraint>,
    //[literal] contains the watchers to wake when that literal is assigned true
    watch_lists: Vec<Vec<PbWatcher>>,
    handler_type: PbHandlerType,
    pub next_position_on_trail_to_propagate: usize,
}

impl PseudoBooleanPropagator {
    pub fn new(handler_type: PbHandlerType) -> PseudoBooleanPropagator {
        PseudoBooleanPropagator {
            constraints: vec![],
            watch_lists: vec![],
            handler_type,
            next_position_on_trail_to_propagate: 0,
        }
    }

    pub fn grow(&mut self) {
        //increase the watch list, once for each polarity
        self.watch_lists.push(vec![]);
        self.watch_lists.push(vec![]);
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    //reason codes of pseudo-Boolean constraints are allocated downwards from the top of the
    //  u32 space, the clause allocator cedes one id per registered constraint
    pub fn get_reason_code(&self, constraint_index: u32) -> u32 {
        u32::MAX - constraint_index
    }

    pub fn get_constraint_index(&self, reason_code: u32) -> u32 {
        marrow_assert_moderate!((u32::MAX - reason_code) < self.constraints.len() as u32);
        u32::MAX - reason_code
    }

    /// Registers a constraint and performs its root-level propagation. The caller is expected
    /// to have normalized the terms (positive weights, one term per variable) and to cede one
    /// clause id for the constraint's reason code.
    pub fn attach_constraint(
        &mut self,
        terms: Vec<WeightedLiteral>,
        rhs: u64,
        assignments: &mut Assignments,
    ) -> PbConstraintAttachmentOutcome {
        marrow_assert_simple!(assignments.is_at_the_root_level());
        marrow_assert_simple!(!terms.is_empty() && terms.iter().all(|term| term.weight > 0));

        let mut terms = terms;
        terms.sort_by(|t1, t2| t2.weight.cmp(&t1.weight));

        let constraint_index = self.constraints.len() as u32;
        let reason_code = self.get_reason_code(constraint_index);

        //the slack accounts for root assignments that are already present
        let slack: i128 = terms
            .iter()
            .filter(|term| !assignments.is_literal_assigned_false(term.literal))
            .map(|term| term.weight as i128)
            .sum::<i128>()
            - rhs as i128;

        let num_terms = terms.len();
        let mut constraint = PseudoBooleanConstraint {
            terms,
            rhs,
            slack,
            watched: vec![false; num_terms],
            watched_sum: 0,
        };

        match self.handler_type {
            PbHandlerType::Counter => {
                //the counter handler registers every term
                for (term_index, term) in constraint.terms.iter().enumerate() {
                    self.watch_lists[!term.literal].push(PbWatcher {
                        constraint_index,
                        term_index: term_index as u32,
                    });
                }
            }
            PbHandlerType::Watched => {
                //greedily watch the largest coefficients until the target is covered
                let target = constraint.watched_weight_target();
                for (term_index, term) in constraint.terms.iter().enumerate() {
                    if constraint.watched_sum >= target {
                        break;
                    }
                    if assignments.is_literal_assigned_false(term.literal) {
                        continue;
                    }
                    constraint.watched[term_index] = true;
                    constraint.watched_sum += term.weight as i128;
                    self.watch_lists[!term.literal].push(PbWatcher {
                        constraint_index,
                        term_index: term_index as u32,
                    });
                }
            }
        }

        if constraint.slack < 0 {
            self.constraints.push(constraint);
            return PbConstraintAttachmentOutcome::RootConflict;
        }

        //root propagation: every unassigned term whose weight exceeds the slack is forced
        let slack = constraint.slack;
        for term in &constraint.terms {
            if (term.weight as i128) <= slack {
                break;
            }
            if assignments.is_literal_unassigned(term.literal) {
                assignments.enqueue_propagated_literal(term.literal, reason_code);
            }
        }

        self.constraints.push(constraint);
        PbConstraintAttachmentOutcome::Attached
    }

    pub fn propagate(&mut self, assignments: &mut Assignments) -> PropagationStatusPb {
        while self.next_position_on_trail_to_propagate < assignments.trail.len() {
            let true_literal = assignments.trail[self.next_position_on_trail_to_propagate];
            marrow_assert_simple!(assignments.is_literal_assigned_true(true_literal));

            let mut conflicting_constraint: Option<u32> = None;

            //watchers may be appended to other literals' lists during processing (the watched
            //  handler extends watch sets), the list of the current literal is only read
            let num_watchers = self.watch_lists[true_literal].len();
            let mut watcher_index = 0;
            while watcher_index < num_watchers {
                let watcher = self.watch_lists[true_literal][watcher_index];
                watcher_index += 1;

                //the constraint state is updated even after a conflict was found so that
                //  backtracking can uniformly restore every processed trail entry
                let detected_conflict = match self.handler_type {
                    PbHandlerType::Counter => {
                        self.process_falsified_term_counter(watcher, assignments, conflicting_constraint.is_some())
                    }
                    PbHandlerType::Watched => {
                        self.process_falsified_term_watched(watcher, assignments, conflicting_constraint.is_some())
                    }
                };

                if detected_conflict && conflicting_constraint.is_none() {
                    conflicting_constraint = Some(watcher.constraint_index);
                }
            }

            self.next_position_on_trail_to_propagate += 1;

            if let Some(constraint_index) = conflicting_constraint {
                return PropagationStatusPb::ConflictDetected { constraint_index };
            }
        }
        PropagationStatusPb::NoConflictDetected
    }

    //updates the slack of the woken constraint and performs the resulting propagation,
    //  returns true if the constraint is now in conflict
    fn process_falsified_term_counter(
        &mut self,
        watcher: PbWatcher,
        assignments: &mut Assignments,
        suppress_propagation: bool,
    ) -> bool {
        let reason_code = self.get_reason_code(watcher.constraint_index);
        let constraint = &mut self.constraints[watcher.constraint_index as usize];
        let falsified_weight = constraint.terms[watcher.term_index as usize].weight;

        constraint.slack -= falsified_weight as i128;

        if constraint.slack < 0 {
            return true;
        }

        if suppress_propagation {
            return false;
        }

        //terms are sorted by decreasing weight, so the scan stops at the first
        //  term whose weight no longer exceeds the slack
        let slack = constraint.slack;
        for term in &constraint.terms {
            if (term.weight as i128) <= slack {
                break;
            }
            if assignments.is_literal_unassigned(term.literal) {
                assignments.enqueue_propagated_literal(term.literal, reason_code);
            }
        }
        false
    }

    //restores the invariant that the watched weight covers the threshold plus the maximum
    //  coefficient, falling back to a full slack computation when that is no longer possible,
    //  returns true if the constraint is now in conflict
    fn process_falsified_term_watched(
        &mut self,
        watcher: PbWatcher,
        assignments: &mut Assignments,
        suppress_propagation: bool,
    ) -> bool {
        let reason_code = self.get_reason_code(watcher.constraint_index);
        let constraint = &mut self.constraints[watcher.constraint_index as usize];
        let falsified_weight = constraint.terms[watcher.term_index as usize].weight;

        constraint.watched_sum -= falsified_weight as i128;

        //extend the watch set over non-falsified unwatched terms
        let target = constraint.watched_weight_target();
        let mut new_watches: Vec<u32> = vec![];
        if constraint.watched_sum < target {
            for (term_index, term) in constraint.terms.iter().enumerate() {
                if constraint.watched[term_index]
                    || assignments.is_literal_assigned_false(term.literal)
                {
                    continue;
                }
                constraint.watched_sum += term.weight as i128;
                new_watches.push(term_index as u32);
                if constraint.watched_sum >= target {
                    break;
                }
            }
            for term_index in &new_watches {
                constraint.watched[*term_index as usize] = true;
            }
        }

        if constraint.watched_sum >= target {
            //enough watched weight remains, neither propagation nor conflict is possible
            self.register_new_watches(watcher.constraint_index, new_watches);
            return false;
        }

        //the watch set can no longer cover the target, compute the exact slack
        let slack: i128 = constraint
            .terms
            .iter()
            .filter(|term| !assignments.is_literal_assigned_false(term.literal))
            .map(|term| term.weight as i128)
            .sum::<i128>()
            - constraint.rhs as i128;

        if slack < 0 {
            self.register_new_watches(watcher.constraint_index, new_watches);
            return true;
        }

        if !suppress_propagation {
            for term in &constraint.terms {
                if (term.weight as i128) <= slack {
                    break;
                }
                if assignments.is_literal_unassigned(term.literal) {
                    assignments.enqueue_propagated_literal(term.literal, reason_code);
                }
            }
        }

        self.register_new_watches(watcher.constraint_index, new_watches);
        false
    }

    fn register_new_watches(&mut self, constraint_index: u32, new_watches: Vec<u32>) {
        for term_index in new_watches {
            let literal = self.constraints[constraint_index as usize].terms[term_index as usize].literal;
            self.watch_lists[!literal].push(PbWatcher {
                constraint_index,
                term_index,
            });
        }
    }

    /// Called for every literal that is popped from the trail during backtracking, before the
    /// propagator is synchronised. Entries that were never processed by the propagator must be
    /// skipped, which is why the original trail position is passed along.
    pub fn notify_literal_unassigned(&mut self, literal: Literal, trail_position: usize) {
        if trail_position >= self.next_position_on_trail_to_propagate {
            return;
        }

        for watcher_index in 0..self.watch_lists[literal].len() {
            let watcher = self.watch_lists[literal][watcher_index];
            let constraint = &mut self.constraints[watcher.constraint_index as usize];
            let weight = constraint.terms[watcher.term_index as usize].weight;
            match self.handler_type {
                PbHandlerType::Counter => {
                    constraint.slack += weight as i128;
                }
                PbHandlerType::Watched => {
                    if constraint.watched[watcher.term_index as usize] {
                        constraint.watched_sum += weight as i128;
                    }
                }
            }
        }
    }

    pub fn synchronise(&mut self, trail_size: usize) {
        self.next_position_on_trail_to_propagate =
            std::cmp::min(self.next_position_on_trail_to_propagate, trail_size);
    }

    pub fn is_propagation_complete(&self, trail_size: usize) -> bool {
        self.next_position_on_trail_to_propagate == trail_size
    }

    /// The reason for a propagated literal as an implied clause: the propagated literal
    /// together with the falsified terms that preceded it on the trail. If all those terms
    /// remain false, the constraint can only reach its threshold by the propagated literal.
    pub fn explain_propagation(
        &self,
        constraint_index: u32,
        propagated_literal: Literal,
        assignments: &Assignments,
        reason_literals: &mut Vec<Literal>,
    ) {
        let constraint = &self.constraints[constraint_index as usize];
        let propagated_position = assignments.get_literal_trail_position(propagated_literal);

        reason_literals.clear();
        reason_literals.push(propagated_literal);
        for term in &constraint.terms {
            if term.literal != propagated_literal
                && assignments.is_literal_assigned_false(term.literal)
                && assignments.get_literal_trail_position(term.literal) < propagated_position
            {
                reason_literals.push(term.literal);
            }
        }
    }

    /// The conflict as an implied clause: all currently falsified terms. The non-falsified
    /// terms sum to less than the threshold, so the falsified terms cannot all remain false.
    pub fn explain_conflict(
        &self,
        constraint_index: u32,
        assignments: &Assignments,
        conflict_literals: &mut Vec<Literal>,
    ) {
        let constraint = &self.constraints[constraint_index as usize];

        conflict_literals.clear();
        for term in &constraint.terms {
            if assignments.is_literal_assigned_false(term.literal) {
                conflict_literals.push(term.literal);
            }
        }
    }

    /// Debug check: evaluates the constraint under a full assignment.
    pub fn debug_is_constraint_satisfied(
        &self,
        constraint_index: u32,
        is_literal_true: impl Fn(Literal) -> bool,
    ) -> bool {
        let constraint = &self.constraints[constraint_index as usize];
        let achieved: u128 = constraint
            .terms
            .iter()
            .filter(|term| is_literal_true(term.literal))
            .map(|term| term.weight as u128)
            .sum();
        achieved >= constraint.rhs as u128
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::PropositionalVariable;

    struct TestSetup {
        assignments: Assignments,
        propagator: PseudoBooleanPropagator,
    }

    impl TestSetup {
        fn with_variables(handler_type: PbHandlerType, num_variables: u32) -> TestSetup {
            let mut assignments = Assignments::new();
            let mut propagator = PseudoBooleanPropagator::new(handler_type);
            for _i in 0..num_variables {
                assignments.grow();
                propagator.grow();
            }
            TestSetup {
                assignments,
                propagator,
            }
        }
    }

    fn literal(index: u32) -> Literal {
        Literal::new(PropositionalVariable::new(index), true)
    }

    fn term(weight: u64, index: u32) -> WeightedLiteral {
        WeightedLiteral {
            literal: literal(index),
            weight,
        }
    }

    fn both_handlers(test: impl Fn(PbHandlerType)) {
        test(PbHandlerType::Counter);
        test(PbHandlerType::Watched);
    }

    #[test]
    fn test_attachment_forces_large_coefficients() {
        both_handlers(|handler_type| {
            let mut setup = TestSetup::with_variables(handler_type, 4);
            //3a + 2b + c >= 4: falsifying a leaves at most 3, so a is forced at the root
            let outcome = setup.propagator.attach_constraint(
                vec![term(3, 1), term(2, 2), term(1, 3)],
                4,
                &mut setup.assignments,
            );

            assert_eq!(outcome, PbConstraintAttachmentOutcome::Attached);
            assert!(setup.assignments.is_literal_assigned_true(literal(1)));
            assert!(setup.assignments.is_literal_unassigned(literal(2)));
            assert!(setup.assignments.is_literal_unassigned(literal(3)));
        });
    }

    #[test]
    fn test_attachment_detects_unreachable_threshold() {
        both_handlers(|handler_type| {
            let mut setup = TestSetup::with_variables(handler_type, 3);
            let outcome = setup.propagator.attach_constraint(
                vec![term(1, 1), term(1, 2)],
                3,
                &mut setup.assignments,
            );
            assert_eq!(outcome, PbConstraintAttachmentOutcome::RootConflict);
        });
    }

    #[test]
    fn test_falsified_term_triggers_propagation() {
        both_handlers(|handler_type| {
            let mut setup = TestSetup::with_variables(handler_type, 4);
            //3a + 2b + c >= 3: no root propagation, falsifying a forces b and c
            let outcome = setup.propagator.attach_constraint(
                vec![term(3, 1), term(2, 2), term(1, 3)],
                3,
                &mut setup.assignments,
            );
            assert_eq!(outcome, PbConstraintAttachmentOutcome::Attached);
            assert!(setup.assignments.is_literal_unassigned(literal(1)));

            setup.assignments.increase_decision_level();
            setup.assignments.enqueue_decision_literal(!literal(1));
            let status = setup.propagator.propagate(&mut setup.assignments);

            assert!(status.no_conflict());
            assert!(setup.assignments.is_literal_assigned_true(literal(2)));
            assert!(setup.assignments.is_literal_assigned_true(literal(3)));
        });
    }

    #[test]
    fn test_conflict_and_backtrack_restore() {
        both_handlers(|handler_type| {
            let mut setup = TestSetup::with_variables(handler_type, 4);
            //2a + 2b + c >= 3: falsifying both a and b leaves at most 1
            let outcome = setup.propagator.attach_constraint(
                vec![term(2, 1), term(2, 2), term(1, 3)],
                3,
                &mut setup.assignments,
            );
            assert_eq!(outcome, PbConstraintAttachmentOutcome::Attached);

            setup.assignments.increase_decision_level();
            setup.assignments.enqueue_decision_literal(!literal(1));
            let status = setup.propagator.propagate(&mut setup.assignments);
            //falsifying a leaves slack zero, so both b and c are forced
            assert!(status.no_conflict());
            assert!(setup.assignments.is_literal_assigned_true(literal(2)));
            assert!(setup.assignments.is_literal_assigned_true(literal(3)));

            //undo everything and falsify both a and b to obtain a conflict
            while setup.assignments.num_assigned_propositional_variables() > 0 {
                let popped = setup.assignments.trail.last().copied().expect("Nonempty trail.");
                let position =
                    setup.assignments.get_literal_trail_position(popped) as usize;
                let _ = setup.assignments.pop_trail();
                setup
                    .propagator
                    .notify_literal_unassigned(popped, position);
            }
            setup.assignments.synchronise(0);
            setup.propagator.synchronise(0);

            setup.assignments.increase_decision_level();
            setup.assignments.enqueue_decision_literal(!literal(1));
            setup.assignments.increase_decision_level();
            setup.assignments.enqueue_decision_literal(!literal(2));
            let status = setup.propagator.propagate(&mut setup.assignments);

            match status {
                PropagationStatusPb::ConflictDetected { constraint_index } => {
                    let mut conflict_literals = vec![];
                    setup.propagator.explain_conflict(
                        constraint_index,
                        &setup.assignments,
                        &mut conflict_literals,
                    );
                    assert_eq!(conflict_literals, vec![literal(1), literal(2)]);
                }
                PropagationStatusPb::NoConflictDetected => {
                    panic!("Expected a conflict when the threshold is unreachable.")
                }
            }
        });
    }

    #[test]
    fn test_propagation_reason_contains_preceding_falsifications() {
        both_handlers(|handler_type| {
            let mut setup = TestSetup::with_variables(handler_type, 4);
            let outcome = setup.propagator.attach_constraint(
                vec![term(3, 1), term(2, 2), term(1, 3)],
                3,
                &mut setup.assignments,
            );
            assert_eq!(outcome, PbConstraintAttachmentOutcome::Attached);

            setup.assignments.increase_decision_level();
            setup.assignments.enqueue_decision_literal(!literal(1));
            let status = setup.propagator.propagate(&mut setup.assignments);
            assert!(status.no_conflict());

            let mut reason_literals = vec![];
            setup.propagator.explain_propagation(
                0,
                literal(2),
                &setup.assignments,
                &mut reason_literals,
            );
            assert_eq!(reason_literals, vec![literal(2), literal(1)]);
        });
    }
}
