//! Error types for solver operations.

use rf_core::error::RfError;
use thiserror::Error;

/// Errors that can occur during a nonlinear solve.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Convergence failed after {iterations} iterations: {what}")]
    ConvergenceFailed { what: String, iterations: usize },

    #[error("Invalid state: {what}")]
    InvalidState { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

impl SolverError {
    /// Whether the failure is a plain lack of convergence, as opposed to a
    /// numerical breakdown (singular matrix, non-finite or non-physical values).
    pub fn is_non_convergence(&self) -> bool {
        matches!(self, SolverError::ConvergenceFailed { .. })
    }
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<RfError> for SolverError {
    fn from(e: RfError) -> Self {
        SolverError::Numeric {
            what: e.to_string(),
        }
    }
}
