use thiserror::Error;

pub type MarrowResult<T> = Result<T, MarrowError>;

#[derive(Error, Debug)]
pub enum MarrowError {
    #[error("Hard clauses violated")]
    InconsistentSolution,
    #[error("Reported objective value is lower than the actual value")]
    InconsistentObjective,
    #[error("IO error, more details: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Failed to read file {1}, more details: {0}")]
    FileReadingError(std::io::Error, String),
    #[error("Failed to parse instance: {0}")]
    ParsingError(String),
    #[error("The constraints of the instance are not accepted by the solver: {0}")]
    ConstraintError(#[from] crate::basic_types::ConstraintOperationError),
    #[error("The supplied file type is not supported.")]
    InvalidInstanceFile,
    #[error("No file location given")]
    MissingFileError,
}
