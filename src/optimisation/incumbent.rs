use log::info;

use crate::basic_types::{Solution, Stopwatch};
use crate::engine::PseudoBooleanSolver;

use super::OptimisationResult;

pub type SolutionCallback = Box<dyn FnMut(&Solution, u64)>;
pub type LowerBoundCallback = Box<dyn FnMut(u64)>;

/// Tracks the best solution found so far together with the proven lower bound, and fires the
/// progress callbacks. The snapshot is kept out-of-band so that a timeout in a later solver
/// call can never invalidate the best-known model.
pub struct Incumbent<'a> {
    solution: Solution,
    objective_value: u64,
    lower_bound: u64,
    on_improved_solution: &'a mut Option<SolutionCallback>,
    on_lower_bound: &'a mut Option<LowerBoundCallback>,
}

impl<'a> Incumbent<'a> {
    pub fn new(
        solver: &PseudoBooleanSolver,
        objective_value: u64,
        lower_bound: u64,
        on_improved_solution: &'a mut Option<SolutionCallback>,
        on_lower_bound: &'a mut Option<LowerBoundCallback>,
    ) -> Incumbent<'a> {
        let solution = solver.get_solution();
        let mut incumbent = Incumbent {
            solution,
            objective_value,
            lower_bound,
            on_improved_solution,
            on_lower_bound,
        };
        incumbent.fire_solution_callback();
        incumbent
    }

    pub fn objective_value(&self) -> u64 {
        self.objective_value
    }

    pub fn lower_bound(&self) -> u64 {
        self.lower_bound
    }

    pub fn update(
        &mut self,
        solver: &PseudoBooleanSolver,
        objective_value: u64,
        stopwatch: &Stopwatch,
    ) {
        self.solution.update(solver.get_propositional_assignments());
        self.objective_value = objective_value;
        info!(
            "Objective improved to {} after {} seconds",
            objective_value,
            stopwatch.get_elapsed_time()
        );
        self.fire_solution_callback();
    }

    pub fn update_lower_bound(&mut self, lower_bound: u64) {
        if lower_bound > self.lower_bound {
            self.lower_bound = lower_bound;
            info!("Lower bound raised to {}", lower_bound);
            if let Some(callback) = self.on_lower_bound.as_mut() {
                callback(lower_bound);
            }
        }
    }

    pub fn as_optimal_result(&self) -> OptimisationResult {
        OptimisationResult::Optimal {
            solution: self.solution.clone(),
            objective_value: self.objective_value,
        }
    }

    pub fn as_satisfiable_result(&self) -> OptimisationResult {
        OptimisationResult::Satisfiable {
            solution: self.solution.clone(),
            objective_value: self.objective_value,
        }
    }

    fn fire_solution_callback(&mut self) {
        if let Some(callback) = self.on_improved_solution.as_mut() {
            callback(&self.solution, self.objective_value);
        }
    }
}
