mod assignments;
mod clause_allocator;
mod learned_clause_minimiser;
mod reasons;
mod restart_strategy;
mod solver;
mod value_selector;
mod variable_selector;

pub use assignments::Assignments;
pub use clause_allocator::ClauseAllocator;
pub use learned_clause_minimiser::{LearnedClauseMinimiser, MinimisationMode};
pub use restart_strategy::{RestartOptions, RestartStrategy};
pub use solver::{
    ConflictAnalysisResult, Counters, LearnedClauseSortingStrategy, PseudoBooleanSolver,
    SolverOptions, SolverState,
};
pub use value_selector::ValueSelector;
pub use variable_selector::VariableSelector;
