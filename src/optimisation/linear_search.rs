use log::info;

use crate::basic_types::{Function, SolverExecutionFlag, Stopwatch};
use crate::engine::PseudoBooleanSolver;
use crate::marrow_assert_moderate;

use super::incumbent::Incumbent;
use super::OptimisationResult;

/// Linear (sat-unsat) search: after every model the objective upper bound is strengthened by
/// one, until the solver proves infeasibility. The last model found is then optimal.
pub struct LinearSearch;

impl LinearSearch {
    pub fn solve(
        solver: &mut PseudoBooleanSolver,
        objective_function: &Function,
        stopwatch: &Stopwatch,
        incumbent: &mut Incumbent,
    ) -> OptimisationResult {
        let constant_term = objective_function.get_constant_term();
        let objective_terms = objective_function.get_function_as_weighted_literals_vector();

        loop {
            //nothing below the constant term is achievable
            if incumbent.objective_value() == constant_term {
                return incumbent.as_optimal_result();
            }

            solver.set_solution_guided_search();
            solver.restore_state_at_root();

            //constrain the objective to improve on the incumbent
            let upper_bound = incumbent.objective_value() - constant_term - 1;
            if solver
                .add_pb_at_most(objective_terms.clone(), upper_bound)
                .is_err()
            {
                return incumbent.as_optimal_result();
            }

            let execution_flag = solver.solve(stopwatch.get_remaining_time_budget());

            match execution_flag {
                SolverExecutionFlag::Feasible => {
                    let objective_value = objective_function
                        .evaluate_assignment(solver.get_propositional_assignments());
                    marrow_assert_moderate!(
                        objective_value < incumbent.objective_value(),
                        "Each iteration of linear search must yield a strictly better solution."
                    );
                    incumbent.update(solver, objective_value, stopwatch);
                }
                SolverExecutionFlag::Infeasible => {
                    info!(
                        "Linear search proved optimality at value {}",
                        incumbent.objective_value()
                    );
                    return incumbent.as_optimal_result();
                }
                SolverExecutionFlag::Timeout => {
                    return incumbent.as_satisfiable_result();
                }
                SolverExecutionFlag::InfeasibleUnderAssumptions => {
                    panic!("Linear search solves without assumptions.")
                }
            }
        }
    }
}
