use crate::basic_types::{ClauseReference, Literal};
use crate::engine::{Assignments, ClauseAllocator};
use crate::marrow_assert_ne_moderate;
use crate::propagators::PseudoBooleanPropagator;

/// Reconstructs the reason for a propagated literal as a list of literals forming an implied
/// clause, with the propagated literal at index zero. Clausal reasons are read off directly;
/// pseudo-Boolean reasons are reduced to a clause over the falsified terms that preceded the
/// propagation on the trail.
pub fn compute_reason_literals(
    propagated_literal: Literal,
    reason_code: u32,
    clause_allocator: &ClauseAllocator,
    pseudo_boolean_propagator: &PseudoBooleanPropagator,
    assignments: &Assignments,
    reason_literals: &mut Vec<Literal>,
) {
    marrow_assert_ne_moderate!(reason_code, 0);

    if clause_allocator.is_reason_code_linked_to_a_clause(reason_code) {
        let clause = clause_allocator.get_clause(ClauseReference { id: reason_code });
        reason_literals.clear();
        reason_literals.extend_from_slice(clause.get_literal_slice());
    } else {
        let constraint_index = pseudo_boolean_propagator.get_constraint_index(reason_code);
        pseudo_boolean_propagator.explain_propagation(
            constraint_index,
            propagated_literal,
            assignments,
            reason_literals,
        );
    }
}
