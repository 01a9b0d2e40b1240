use rf_sim::SimProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingCase,
    CheckingCache,
    LoadingCachedResult,
    CompilingRuntime,
    LoadingCheckpoint,
    RunningSchedule,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::LoadingCase => "loading case",
            RunStage::CheckingCache => "checking cache",
            RunStage::LoadingCachedResult => "loading cached result",
            RunStage::CompilingRuntime => "compiling",
            RunStage::LoadingCheckpoint => "loading checkpoint",
            RunStage::RunningSchedule => "running",
            RunStage::SavingResults => "saving",
            RunStage::Completed => "completed",
        }
    }
}

/// Report-step progress while the schedule runs.
#[derive(Debug, Clone, Default)]
pub struct ScheduleProgress {
    pub report_step: usize,
    pub num_report_steps: usize,
    pub sim_time_days: f64,
    pub total_time_days: f64,
    pub fraction_complete: f64,
    pub substeps: usize,
    pub failed_substeps: usize,
    pub suggested_step_days: Option<f64>,
}

impl From<&SimProgress> for ScheduleProgress {
    fn from(p: &SimProgress) -> Self {
        use rf_core::units::seconds_to_days;
        Self {
            report_step: p.report_step,
            num_report_steps: p.num_steps,
            sim_time_days: seconds_to_days(p.sim_time),
            total_time_days: seconds_to_days(p.total_time),
            fraction_complete: p.fraction_complete,
            substeps: p.substeps,
            failed_substeps: p.failed_substeps,
            suggested_step_days: p.suggested_next_step.map(seconds_to_days),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub schedule: Option<ScheduleProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            schedule: None,
        }
    }
}
