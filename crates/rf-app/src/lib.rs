//! Shared application service layer for resflow.
//!
//! Centralizes case loading, runtime compilation, run execution with
//! persistence and restart, and result querying for the CLI.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;
pub mod runtime_compile;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, ScheduleProgress};
pub use project_service::{CaseSummary, load_case, save_case, summarize_case};
pub use query::{SnapshotOverview, extract_series, get_overview};
pub use run_service::{
    LoadedRun, RunOptions, RunRequest, RunResponse, RunTimingSummary, execute_case,
    execute_case_with_progress, list_runs, load_run, open_store,
};
pub use runtime_compile::{CaseRuntime, compile_case};
