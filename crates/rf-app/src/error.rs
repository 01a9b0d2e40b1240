//! Error types for the rf-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI a single error to report.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Case error: {0}")]
    Case(String),

    #[error("Case file not found: {path}")]
    CaseNotFound { path: PathBuf },

    #[error("Case compilation failed: {0}")]
    Compile(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Checkpoint error: {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<rf_project::ProjectError> for AppError {
    fn from(err: rf_project::ProjectError) -> Self {
        AppError::Case(err.to_string())
    }
}

impl From<rf_models::ModelError> for AppError {
    fn from(err: rf_models::ModelError) -> Self {
        AppError::Model(err.to_string())
    }
}

impl From<rf_sim::SimError> for AppError {
    fn from(err: rf_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<rf_results::ResultsError> for AppError {
    fn from(err: rf_results::ResultsError) -> Self {
        match err {
            rf_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
