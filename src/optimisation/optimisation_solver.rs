use log::debug;

use crate::basic_types::{Function, SolverExecutionFlag, Stopwatch};
use crate::engine::PseudoBooleanSolver;

use super::binary_search::ProbePointSelection;
use super::incumbent::{Incumbent, LowerBoundCallback, SolutionCallback};
use super::{BinarySearch, FuMalikSearch, LinearSearch, Msu4Search, OptimisationResult};

/// The search strategy used to minimise the objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimisationStrategy {
    /// Strengthen the upper bound by one after every model.
    Linear,
    /// Probe the midpoint between the proven lower bound and the incumbent.
    Binary,
    /// Probe an adaptively chosen point between the bounds.
    Adaptive,
    /// Fu-Malik style unsat-core guided search.
    UnsatCore,
    /// MSU4 style search alternating core extraction and upper-bound refinement.
    Msu4,
}

impl std::fmt::Display for OptimisationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimisationStrategy::Linear => write!(f, "linear"),
            OptimisationStrategy::Binary => write!(f, "binary"),
            OptimisationStrategy::Adaptive => write!(f, "adaptive"),
            OptimisationStrategy::UnsatCore => write!(f, "unsat-core"),
            OptimisationStrategy::Msu4 => write!(f, "msu4"),
        }
    }
}

/// Minimises a linear objective over the models of a solver. The optimiser borrows the solver
/// per call and owns its own best-model snapshot, so interrupting a call leaves the snapshot
/// intact. Progress is observable through the improved-solution and lower-bound callbacks,
/// which must not re-enter the solver.
pub struct OptimisationSolver {
    strategy: OptimisationStrategy,
    on_improved_solution: Option<SolutionCallback>,
    on_lower_bound: Option<LowerBoundCallback>,
    use_objective_heuristics: bool,
}

impl OptimisationSolver {
    pub fn new(strategy: OptimisationStrategy) -> OptimisationSolver {
        OptimisationSolver {
            strategy,
            on_improved_solution: None,
            on_lower_bound: None,
            use_objective_heuristics: true,
        }
    }

    /// The callback is invoked for every improved solution, including the first one.
    pub fn with_solution_callback(mut self, callback: SolutionCallback) -> OptimisationSolver {
        self.on_improved_solution = Some(callback);
        self
    }

    /// The callback is invoked for every raised lower bound.
    pub fn with_lower_bound_callback(mut self, callback: LowerBoundCallback) -> OptimisationSolver {
        self.on_lower_bound = Some(callback);
        self
    }

    /// Enables or disables polarity and activity hints derived from the objective.
    pub fn set_objective_heuristics(&mut self, enabled: bool) {
        self.use_objective_heuristics = enabled;
    }

    pub fn optimise(
        &mut self,
        solver: &mut PseudoBooleanSolver,
        objective_function: &Function,
        time_limit_in_seconds: i64,
    ) -> OptimisationResult {
        let stopwatch = Stopwatch::new(time_limit_in_seconds);

        let objective_terms = objective_function.get_function_as_weighted_literals_vector();

        if self.use_objective_heuristics && !objective_terms.is_empty() {
            //prefer the polarity that contributes nothing to the objective, and bump the
            //  activity of objective variables proportionally to their weight so that early
            //  decisions keep the objective small
            let maximum_weight = objective_terms
                .iter()
                .map(|term| term.weight)
                .max()
                .expect("The terms are nonempty.");
            for term in &objective_terms {
                let variable = term.literal.get_propositional_variable();
                solver.set_preferred_polarity(variable, !term.literal.is_positive());
                solver.bump_variable_activity(variable, term.weight as f64 / maximum_weight as f64);
            }
        }

        debug!(
            "Optimising with the {} strategy over {} objective terms",
            self.strategy,
            objective_terms.len()
        );

        //compute an initial solution against the hard constraints alone
        let execution_flag = solver.solve(stopwatch.get_remaining_time_budget());
        match execution_flag {
            SolverExecutionFlag::Infeasible => return OptimisationResult::Infeasible,
            SolverExecutionFlag::Timeout => return OptimisationResult::Unknown,
            SolverExecutionFlag::InfeasibleUnderAssumptions => {
                panic!("The initial call solves without assumptions.")
            }
            SolverExecutionFlag::Feasible => {}
        }

        let objective_value =
            objective_function.evaluate_assignment(solver.get_propositional_assignments());
        let mut incumbent = Incumbent::new(
            solver,
            objective_value,
            objective_function.get_constant_term(),
            &mut self.on_improved_solution,
            &mut self.on_lower_bound,
        );

        match self.strategy {
            OptimisationStrategy::Linear => {
                LinearSearch::solve(solver, objective_function, &stopwatch, &mut incumbent)
            }
            OptimisationStrategy::Binary => BinarySearch::solve(
                solver,
                objective_function,
                &stopwatch,
                &mut incumbent,
                ProbePointSelection::Midpoint,
            ),
            OptimisationStrategy::Adaptive => BinarySearch::solve(
                solver,
                objective_function,
                &stopwatch,
                &mut incumbent,
                ProbePointSelection::Adaptive,
            ),
            OptimisationStrategy::UnsatCore => {
                FuMalikSearch::solve(solver, objective_function, &stopwatch, &mut incumbent)
            }
            OptimisationStrategy::Msu4 => {
                Msu4Search::solve(solver, objective_function, &stopwatch, &mut incumbent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::basic_types::{Literal, WeightedLiteral};
    use crate::engine::SolverOptions;

    const ALL_STRATEGIES: [OptimisationStrategy; 5] = [
        OptimisationStrategy::Linear,
        OptimisationStrategy::Binary,
        OptimisationStrategy::Adaptive,
        OptimisationStrategy::UnsatCore,
        OptimisationStrategy::Msu4,
    ];

    fn solver_with_literals(num_variables: u32) -> (PseudoBooleanSolver, Vec<Literal>) {
        let mut solver = PseudoBooleanSolver::new(SolverOptions::default());
        let literals = solver
            .new_variables(num_variables)
            .into_iter()
            .map(|variable| Literal::new(variable, true))
            .collect();
        (solver, literals)
    }

    fn weighted(literal: Literal, weight: u64) -> WeightedLiteral {
        WeightedLiteral { literal, weight }
    }

    fn expect_optimal(result: OptimisationResult) -> u64 {
        match result {
            OptimisationResult::Optimal {
                objective_value, ..
            } => objective_value,
            OptimisationResult::Satisfiable { .. } => {
                panic!("Expected a proven optimum, got a feasible-but-unproven result.")
            }
            OptimisationResult::Infeasible => panic!("Expected a proven optimum, got infeasible."),
            OptimisationResult::Unknown => panic!("Expected a proven optimum, got unknown."),
        }
    }

    #[test]
    fn test_minimum_number_of_true_literals() {
        //minimise x1 + x2 + x3 subject to x1 + x2 + x3 >= 2
        for strategy in ALL_STRATEGIES {
            let (mut solver, literals) = solver_with_literals(3);
            solver
                .add_at_least(literals.clone(), 2)
                .expect("Valid constraint.");

            let mut objective_function = Function::new();
            for literal in &literals {
                objective_function.add_weighted_literal(*literal, 1);
            }

            let mut optimiser = OptimisationSolver::new(strategy);
            let result = optimiser.optimise(&mut solver, &objective_function, i64::MAX);
            assert_eq!(expect_optimal(result), 2, "strategy {}", strategy);
        }
    }

    #[test]
    fn test_weighted_vertex_cover_triangle() {
        //minimise 5x1 + 4x2 + 3x3 subject to the edges of a triangle, the optimum picks x2, x3
        for strategy in ALL_STRATEGIES {
            let (mut solver, literals) = solver_with_literals(3);
            solver
                .add_clause(vec![literals[0], literals[1]])
                .expect("Valid clause.");
            solver
                .add_clause(vec![literals[1], literals[2]])
                .expect("Valid clause.");
            solver
                .add_clause(vec![literals[0], literals[2]])
                .expect("Valid clause.");

            let mut objective_function = Function::new();
            objective_function.add_weighted_literal(literals[0], 5);
            objective_function.add_weighted_literal(literals[1], 4);
            objective_function.add_weighted_literal(literals[2], 3);

            let mut optimiser = OptimisationSolver::new(strategy);
            let result = optimiser.optimise(&mut solver, &objective_function, i64::MAX);

            match result {
                OptimisationResult::Optimal {
                    solution,
                    objective_value,
                } => {
                    assert_eq!(objective_value, 7, "strategy {}", strategy);
                    assert!(!solution.get_literal_value(literals[0]));
                    assert!(solution.get_literal_value(literals[1]));
                    assert!(solution.get_literal_value(literals[2]));
                }
                _ => panic!("Expected a proven optimum for strategy {}", strategy),
            }
        }
    }

    #[test]
    fn test_maxsat_with_relaxed_soft_clauses() {
        //hard clause {1, 2}; soft clauses {~1}, {~2}, {~1, ~2}, all of weight one,
        //  encoded with relaxation literals; the minimum violated weight is 1
        for strategy in ALL_STRATEGIES {
            let (mut solver, literals) = solver_with_literals(6);
            let (x1, x2) = (literals[0], literals[1]);
            let relaxations = [literals[2], literals[3], literals[4]];

            solver.add_clause(vec![x1, x2]).expect("Valid clause.");
            solver
                .add_clause(vec![!x1, relaxations[0]])
                .expect("Valid clause.");
            solver
                .add_clause(vec![!x2, relaxations[1]])
                .expect("Valid clause.");
            solver
                .add_clause(vec![!x1, !x2, relaxations[2]])
                .expect("Valid clause.");

            let mut objective_function = Function::new();
            for relaxation in relaxations {
                objective_function.add_weighted_literal(relaxation, 1);
            }

            let mut optimiser = OptimisationSolver::new(strategy);
            let result = optimiser.optimise(&mut solver, &objective_function, i64::MAX);
            assert_eq!(expect_optimal(result), 1, "strategy {}", strategy);
        }
    }

    #[test]
    fn test_constant_term_is_reported() {
        for strategy in ALL_STRATEGIES {
            let (mut solver, literals) = solver_with_literals(1);
            solver.add_clause(vec![literals[0]]).expect("Valid clause.");

            let mut objective_function = Function::new();
            objective_function.add_constant_term(10);

            let mut optimiser = OptimisationSolver::new(strategy);
            let result = optimiser.optimise(&mut solver, &objective_function, i64::MAX);
            assert_eq!(expect_optimal(result), 10, "strategy {}", strategy);
        }
    }

    #[test]
    fn test_infeasible_hard_constraints() {
        for strategy in ALL_STRATEGIES {
            let (mut solver, literals) = solver_with_literals(1);
            solver.add_clause(vec![literals[0]]).expect("Valid clause.");
            solver.add_clause(vec![!literals[0]]).expect("Valid clause.");

            let mut objective_function = Function::new();
            objective_function.add_weighted_literal(literals[0], 1);

            let mut optimiser = OptimisationSolver::new(strategy);
            let result = optimiser.optimise(&mut solver, &objective_function, i64::MAX);
            assert!(matches!(result, OptimisationResult::Infeasible));
        }
    }

    #[test]
    fn test_zero_time_budget_is_unknown() {
        let (mut solver, literals) = solver_with_literals(2);
        solver
            .add_clause(vec![literals[0], literals[1]])
            .expect("Valid clause.");

        let mut objective_function = Function::new();
        objective_function.add_weighted_literal(literals[0], 1);

        let mut optimiser = OptimisationSolver::new(OptimisationStrategy::Linear);
        let result = optimiser.optimise(&mut solver, &objective_function, 0);
        assert!(matches!(result, OptimisationResult::Unknown));
    }

    #[test]
    fn test_callbacks_observe_progress() {
        let (mut solver, literals) = solver_with_literals(3);
        solver
            .add_at_least(literals.clone(), 2)
            .expect("Valid constraint.");

        let mut objective_function = Function::new();
        for literal in &literals {
            objective_function.add_weighted_literal(*literal, 1);
        }

        let observed_values: Rc<RefCell<Vec<u64>>> = Rc::new(RefCell::new(vec![]));
        let recorded = Rc::clone(&observed_values);

        let mut optimiser = OptimisationSolver::new(OptimisationStrategy::Linear)
            .with_solution_callback(Box::new(move |_solution, objective_value| {
                recorded.borrow_mut().push(objective_value);
            }));
        let result = optimiser.optimise(&mut solver, &objective_function, i64::MAX);

        assert_eq!(expect_optimal(result), 2);
        let observed = observed_values.borrow();
        assert!(!observed.is_empty());
        //values arrive in strictly improving order and end at the optimum
        assert!(observed.windows(2).all(|pair| pair[0] > pair[1]) || observed.len() == 1);
        assert_eq!(*observed.last().expect("Nonempty."), 2);
    }
}
