//! Report-step driven transient simulation.
//!
//! Provides:
//! - Report-step driver with per-step subsystem notifications and snapshots
//! - Adaptive substep controller with retry-on-failure
//! - Nonlinear solver adapter with state rollback
//! - Associative timing/convergence reports
//! - Restart step-size bridge, schedule events and tuning

pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod events;
pub mod output;
pub mod report;
pub mod restart;
pub mod solver;
pub mod subsystem;
pub mod timeline;

// Re-exports for public API
pub use config::{StepSizePolicy, SteppingConfig};
pub use controller::{AdaptiveSubstepController, StepReport, Substep};
pub use driver::{RankInfo, ReportStepDriver, SimProgress};
pub use error::{SimError, SimResult};
pub use events::{
    EventFeed, NoEvents, ScheduleEvent, ScheduleEvents, TuningParams, TuningTable, well_event_at,
};
pub use output::{MemorySink, NullSink, OutputSink, SnapshotInfo};
pub use report::SimulatorReport;
pub use restart::{
    RestartDiagnostic, RestartHint, RestartValues, SUGGESTED_STEP_KEY, resolve_initial_suggestion,
};
pub use solver::{
    FailureReason, NewtonReport, NonlinearModel, SolveFailure, SolverAdapter, SolverFactory,
    StepOutcome,
};
pub use subsystem::{ReportStepInfo, Subsystem, Subsystems};
pub use timeline::Timeline;
