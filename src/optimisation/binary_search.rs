use crate::basic_types::{Function, Literal, SolverExecutionFlag, Stopwatch};
use crate::engine::PseudoBooleanSolver;
use crate::marrow_assert_moderate;

use super::incumbent::Incumbent;
use super::OptimisationResult;

/// Selects the next objective value to probe between the proven lower bound and the best
/// known value: the midpoint (classic binary search), or an adaptive point that moves towards
/// the lower bound after successful probes and towards the incumbent after failed ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbePointSelection {
    Midpoint,
    Adaptive,
}

/// Bound-probing search: a removable upper-bound constraint is activated through a fresh
/// selector and solved under that assumption. A satisfiable probe tightens the upper bound
/// permanently; an unsatisfiable probe raises the lower bound permanently. The search stops
/// when the bounds meet.
pub struct BinarySearch;

impl BinarySearch {
    pub fn solve(
        solver: &mut PseudoBooleanSolver,
        objective_function: &Function,
        stopwatch: &Stopwatch,
        incumbent: &mut Incumbent,
        probe_point_selection: ProbePointSelection,
    ) -> OptimisationResult {
        let constant_term = objective_function.get_constant_term();
        let objective_terms = objective_function.get_function_as_weighted_literals_vector();

        //the static lower bound: no solution can cost less than the constant term
        let mut lower_bound = std::cmp::max(incumbent.lower_bound(), constant_term);
        let mut adaptive_fraction: f64 = 0.5;

        loop {
            if incumbent.objective_value() == constant_term {
                return incumbent.as_optimal_result();
            }
            let upper_bound = incumbent.objective_value() - 1;
            if lower_bound > upper_bound {
                return incumbent.as_optimal_result();
            }

            let probe = match probe_point_selection {
                ProbePointSelection::Midpoint => lower_bound + (upper_bound - lower_bound) / 2,
                ProbePointSelection::Adaptive => {
                    lower_bound + ((upper_bound - lower_bound) as f64 * adaptive_fraction) as u64
                }
            };
            marrow_assert_moderate!(lower_bound <= probe && probe <= upper_bound);

            if solver.get_state().has_solution() {
                solver.set_solution_guided_search();
            }
            solver.restore_state_at_root();

            //the probe bound is conditioned on a fresh selector so that a failed probe
            //  does not poison the constraint store
            let selector = Literal::new(solver.new_variable(), true);
            if solver
                .add_pb_at_most_soft(selector, objective_terms.clone(), probe - constant_term)
                .is_err()
            {
                return incumbent.as_optimal_result();
            }

            let execution_flag =
                solver.solve_under_assumptions(&[selector], stopwatch.get_remaining_time_budget());

            match execution_flag {
                SolverExecutionFlag::Feasible => {
                    let objective_value = objective_function
                        .evaluate_assignment(solver.get_propositional_assignments());
                    marrow_assert_moderate!(objective_value <= probe);
                    incumbent.update(solver, objective_value, stopwatch);

                    //the upper bound is now known to be achievable, make improving on it permanent
                    solver.restore_state_at_root();
                    if objective_value > constant_term
                        && solver
                            .add_pb_at_most(
                                objective_terms.clone(),
                                objective_value - constant_term - 1,
                            )
                            .is_err()
                    {
                        return incumbent.as_optimal_result();
                    }

                    //probe closer to the lower bound next time
                    adaptive_fraction /= 2.0;
                }
                SolverExecutionFlag::InfeasibleUnderAssumptions => {
                    lower_bound = probe + 1;
                    incumbent.update_lower_bound(lower_bound);

                    solver.restore_state_at_root();
                    if solver
                        .add_pb_at_least(objective_terms.clone(), lower_bound - constant_term)
                        .is_err()
                    {
                        return incumbent.as_optimal_result();
                    }

                    //probe closer to the incumbent next time
                    adaptive_fraction = (adaptive_fraction + 1.0) / 2.0;
                }
                SolverExecutionFlag::Infeasible => {
                    //the permanent bounds have closed the search space
                    return incumbent.as_optimal_result();
                }
                SolverExecutionFlag::Timeout => {
                    return incumbent.as_satisfiable_result();
                }
            }
        }
    }
}
