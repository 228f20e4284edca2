use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConstraintOperationError {
    #[error("The constraint refers to a variable that has not been created by the solver")]
    VariableOutOfRange,
    #[error("Pseudo-Boolean constraints require nonzero coefficients")]
    ZeroCoefficient,
    #[error("A pseudo-Boolean constraint with no terms cannot reach a positive threshold")]
    EmptyPseudoBooleanConstraint,
}
