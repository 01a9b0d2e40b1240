//! Error types for the stepping core.

use thiserror::Error;

/// Errors surfaced by the driver and controller.
///
/// Substep convergence failures are not errors: they are reported through
/// `StepOutcome` and folded into the failure report.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Output write failed: {message}")]
    Output { message: String },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<rf_core::error::RfError> for SimError {
    fn from(e: rf_core::error::RfError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Output {
            message: e.to_string(),
        }
    }
}
