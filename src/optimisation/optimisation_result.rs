use crate::basic_types::Solution;

/// The outcome of an optimisation run. `Optimal` is only reported when the search itself has
/// proven that no better solution exists; a timeout with a feasible-but-unproven solution is
/// reported as `Satisfiable`, and a timeout before any solution was found as `Unknown`.
pub enum OptimisationResult {
    Optimal {
        solution: Solution,
        objective_value: u64,
    },
    Satisfiable {
        solution: Solution,
        objective_value: u64,
    },
    Infeasible,
    Unknown,
}
