use crate::basic_types::{
    Function, HashSet, Literal, SolverExecutionFlag, Stopwatch, WeightedLiteral,
};
use crate::engine::PseudoBooleanSolver;
use crate::marrow_assert_moderate;
use crate::marrow_assert_simple;

use super::incumbent::Incumbent;
use super::OptimisationResult;

struct SoftItem {
    literals: Vec<Literal>,
    selector: Literal,
    weight: u64,
}

/// Unsat-core guided search in the style of Fu and Malik, with the weight-splitting rule of
/// WPM1 for weighted objectives: every objective literal becomes a soft clause demanding its
/// falsity, activated through a selector assumption. Each unsatisfiable core is relaxed with
/// fresh relaxation literals tied together by an exactly-one constraint, raising the lower
/// bound by the minimum weight of the core. The first satisfiable call is optimal.
pub struct FuMalikSearch;

impl FuMalikSearch {
    pub fn solve(
        solver: &mut PseudoBooleanSolver,
        objective_function: &Function,
        stopwatch: &Stopwatch,
        incumbent: &mut Incumbent,
    ) -> OptimisationResult {
        let constant_term = objective_function.get_constant_term();
        let mut lower_bound = constant_term;

        let mut soft_items: Vec<SoftItem> = vec![];
        for term in objective_function.get_function_as_weighted_literals_vector() {
            let selector = Literal::new(solver.new_variable(), true);
            if solver
                .add_clause(vec![!term.literal, !selector])
                .is_err()
            {
                return incumbent.as_satisfiable_result();
            }
            soft_items.push(SoftItem {
                literals: vec![!term.literal],
                selector,
                weight: term.weight,
            });
        }

        loop {
            let assumptions: Vec<Literal> =
                soft_items.iter().map(|item| item.selector).collect();

            solver.restore_state_at_root();
            let execution_flag =
                solver.solve_under_assumptions(&assumptions, stopwatch.get_remaining_time_budget());

            match execution_flag {
                SolverExecutionFlag::Feasible => {
                    let objective_value = objective_function
                        .evaluate_assignment(solver.get_propositional_assignments());
                    marrow_assert_moderate!(
                        objective_value == lower_bound,
                        "A satisfiable core-guided call must match the derived lower bound."
                    );
                    if objective_value < incumbent.objective_value() {
                        incumbent.update(solver, objective_value, stopwatch);
                    }
                    return incumbent.as_optimal_result();
                }
                SolverExecutionFlag::InfeasibleUnderAssumptions => {
                    let core: HashSet<Literal> = solver.extract_core().into_iter().collect();
                    marrow_assert_simple!(!core.is_empty());

                    let core_indices: Vec<usize> = (0..soft_items.len())
                        .filter(|index| core.contains(&soft_items[*index].selector))
                        .collect();
                    marrow_assert_simple!(
                        !core_indices.is_empty(),
                        "The core consists of assumption literals, which are all selectors."
                    );

                    let minimum_weight = core_indices
                        .iter()
                        .map(|index| soft_items[*index].weight)
                        .min()
                        .expect("The core is nonempty.");
                    lower_bound += minimum_weight;
                    incumbent.update_lower_bound(lower_bound);

                    solver.restore_state_at_root();

                    //relax every soft clause of the core with a fresh relaxation literal,
                    //  soft clauses above the minimum weight are split: the remainder keeps
                    //  its original selector, the relaxed copy carries the minimum weight
                    let mut relaxation_literals: Vec<Literal> = vec![];
                    let mut relaxed_items: Vec<SoftItem> = vec![];
                    for index in core_indices.iter().rev() {
                        let relaxation_literal = Literal::new(solver.new_variable(), true);
                        relaxation_literals.push(relaxation_literal);

                        let mut relaxed_literals = soft_items[*index].literals.clone();
                        relaxed_literals.push(relaxation_literal);

                        let relaxed_selector = Literal::new(solver.new_variable(), true);
                        let mut relaxed_clause = relaxed_literals.clone();
                        relaxed_clause.push(!relaxed_selector);
                        if solver.add_clause(relaxed_clause).is_err() {
                            return incumbent.as_satisfiable_result();
                        }
                        relaxed_items.push(SoftItem {
                            literals: relaxed_literals,
                            selector: relaxed_selector,
                            weight: minimum_weight,
                        });

                        if soft_items[*index].weight > minimum_weight {
                            soft_items[*index].weight -= minimum_weight;
                        } else {
                            //note that the indices are visited in decreasing order,
                            //  so removal does not shift the remaining core indices
                            let _ = soft_items.swap_remove(*index);
                        }
                    }
                    soft_items.append(&mut relaxed_items);

                    if solver.add_exactly(relaxation_literals, 1).is_err() {
                        return incumbent.as_satisfiable_result();
                    }
                }
                SolverExecutionFlag::Infeasible => {
                    //the hard constraints admit the incumbent, so this cannot be reached by
                    //  the relaxation clauses; report the best known model without claiming
                    //  optimality
                    return incumbent.as_satisfiable_result();
                }
                SolverExecutionFlag::Timeout => {
                    return incumbent.as_satisfiable_result();
                }
            }
        }
    }
}

/// MSU4-style search: the objective literals start out assumed false; every unsatisfiable
/// core releases its literals from the assumption set and raises the lower bound, every
/// satisfiable call tightens the upper bound permanently. The search concludes when the
/// bounds meet or the strengthened constraint store becomes infeasible.
pub struct Msu4Search;

impl Msu4Search {
    pub fn solve(
        solver: &mut PseudoBooleanSolver,
        objective_function: &Function,
        stopwatch: &Stopwatch,
        incumbent: &mut Incumbent,
    ) -> OptimisationResult {
        let constant_term = objective_function.get_constant_term();
        let objective_terms = objective_function.get_function_as_weighted_literals_vector();

        let mut active_terms: Vec<WeightedLiteral> = objective_terms.clone();
        let mut lower_bound = constant_term;

        loop {
            let assumptions: Vec<Literal> = active_terms
                .iter()
                .map(|term| !term.literal)
                .collect();

            solver.restore_state_at_root();
            let execution_flag =
                solver.solve_under_assumptions(&assumptions, stopwatch.get_remaining_time_budget());

            match execution_flag {
                SolverExecutionFlag::Feasible => {
                    let objective_value = objective_function
                        .evaluate_assignment(solver.get_propositional_assignments());
                    if objective_value < incumbent.objective_value() {
                        incumbent.update(solver, objective_value, stopwatch);
                    }

                    if incumbent.objective_value() <= lower_bound {
                        return incumbent.as_optimal_result();
                    }

                    //forbid the incumbent value and everything above it
                    solver.restore_state_at_root();
                    if solver
                        .add_pb_at_most(
                            objective_terms.clone(),
                            incumbent.objective_value() - constant_term - 1,
                        )
                        .is_err()
                    {
                        return incumbent.as_optimal_result();
                    }
                }
                SolverExecutionFlag::InfeasibleUnderAssumptions => {
                    let core: HashSet<Literal> = solver.extract_core().into_iter().collect();

                    //release the core literals from the assumption set
                    let mut released: Vec<WeightedLiteral> = vec![];
                    active_terms.retain(|term| {
                        if core.contains(&!term.literal) {
                            released.push(*term);
                            false
                        } else {
                            true
                        }
                    });
                    marrow_assert_simple!(
                        !released.is_empty(),
                        "A core must mention at least one assumption."
                    );

                    let minimum_weight = released
                        .iter()
                        .map(|term| term.weight)
                        .min()
                        .expect("The released set is nonempty.");
                    lower_bound += minimum_weight;
                    incumbent.update_lower_bound(lower_bound);

                    solver.restore_state_at_root();
                    //at least one literal of the core must be paid for
                    let released_literals: Vec<Literal> =
                        released.iter().map(|term| term.literal).collect();
                    if solver.add_clause(released_literals).is_err() {
                        return incumbent.as_satisfiable_result();
                    }
                    if solver
                        .add_pb_at_least(objective_terms.clone(), lower_bound - constant_term)
                        .is_err()
                    {
                        return incumbent.as_satisfiable_result();
                    }
                }
                SolverExecutionFlag::Infeasible => {
                    //the permanent upper bound excluded every remaining candidate
                    return incumbent.as_optimal_result();
                }
                SolverExecutionFlag::Timeout => {
                    return incumbent.as_satisfiable_result();
                }
            }
        }
    }
}
