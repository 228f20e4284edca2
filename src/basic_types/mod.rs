mod branching_decision;
mod clause;
mod clause_reference;
mod constraint_operation_error;
mod file_format;
mod function;
mod hash_structures;
mod key_value_heap;
mod literal;
mod propositional_variable;
mod solution;
mod solver_execution_flag;
mod stopwatch;
mod weighted_literal;

pub mod sequence_generators;

pub use branching_decision::BranchingDecision;
pub use clause::Clause;
pub use clause_reference::ClauseReference;
pub use constraint_operation_error::ConstraintOperationError;
pub use file_format::FileFormat;
pub use function::Function;
pub use hash_structures::{HashMap, HashSet};
pub use key_value_heap::KeyValueHeap;
pub use literal::Literal;
pub use propositional_variable::{PropositionalVariable, PropositionalVariableGeneratorIterator};
pub use solution::Solution;
pub use solver_execution_flag::SolverExecutionFlag;
pub use stopwatch::Stopwatch;
pub use weighted_literal::WeightedLiteral;
