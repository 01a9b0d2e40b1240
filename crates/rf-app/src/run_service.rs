//! Run execution and caching service.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rf_core::timing::Timer;
use rf_models::ReservoirState;
use rf_results::store::load_checkpoint_file;
use rf_results::{
    CheckpointRecord, RunKind, RunManifest, RunStore, RunSummary, SnapshotRecord, StoreSink,
};
use rf_sim::{ReportStepDriver, RestartHint, SimProgress, resolve_initial_suggestion};

use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage, ScheduleProgress};
use crate::project_service;
use crate::runtime_compile;

pub const SOLVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options for running a case.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub solver_version: String,
    /// Overrides `stepping.adaptive` from the case file
    pub adaptive: Option<bool>,
    /// Overrides `stepping.terminal_output` from the case file
    pub terminal_output: Option<bool>,
    /// Run store root; defaults to `.resflow/runs` next to the case
    pub output_dir: Option<PathBuf>,
    /// Resume from this `checkpoint.json`
    pub restart_from: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            solver_version: SOLVER_VERSION.to_string(),
            adaptive: None,
            terminal_output: None,
            output_dir: None,
            restart_from: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub case_path: &'a Path,
    pub options: RunOptions,
}

/// Wall-clock breakdown of a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub solve_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub manifest: RunManifest,
    pub summary: RunSummary,
    pub loaded_from_cache: bool,
    /// How the first step suggestion was chosen
    pub restart: RestartHint,
    pub timing: RunTimingSummary,
}

/// A stored run read back from disk.
#[derive(Debug, Clone)]
pub struct LoadedRun {
    pub manifest: RunManifest,
    /// Absent while a run is in progress or if it was interrupted
    pub summary: Option<RunSummary>,
    pub snapshots: Vec<SnapshotRecord<ReservoirState>>,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    schedule: Option<ScheduleProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            schedule,
        });
    }
}

/// Store rooted at `output_dir`, or next to the case file.
pub fn open_store(case_path: &Path, output_dir: Option<&Path>) -> AppResult<RunStore> {
    let store = match output_dir {
        Some(dir) => RunStore::new(dir.to_path_buf())?,
        None => RunStore::for_case(case_path)?,
    };
    Ok(store)
}

/// Execute a case, or load it from the store when an identical fresh run exists.
pub fn execute_case(request: &RunRequest) -> AppResult<RunResponse> {
    execute_case_with_progress(request, None)
}

/// Execute a case and stream progress events.
pub fn execute_case_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();
    let options = &request.options;

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingCase,
        started,
        Some("Loading case".to_string()),
        None,
    );
    let mut case = project_service::load_case(request.case_path)?;
    if let Some(adaptive) = options.adaptive {
        case.stepping.adaptive = adaptive;
    }
    if let Some(terminal_output) = options.terminal_output {
        case.stepping.terminal_output = terminal_output;
    }

    emit_progress(
        &mut progress_cb,
        RunStage::CompilingRuntime,
        started,
        None,
        None,
    );
    let compile_timer = Timer::start("compile_case");
    let runtime = runtime_compile::compile_case(&case)?;
    let model = runtime.model()?;
    timing.compile_time_s = compile_timer.stop_and_log().as_secs_f64();

    let store = open_store(request.case_path, options.output_dir.as_deref())?;

    let mut timeline = runtime.timeline.clone();
    let (mut state, restart, run_kind) = match &options.restart_from {
        Some(path) => {
            emit_progress(
                &mut progress_cb,
                RunStage::LoadingCheckpoint,
                started,
                Some(path.display().to_string()),
                None,
            );
            let checkpoint = load_checkpoint(path)?;
            let restart = resolve_initial_suggestion(Some(&checkpoint));
            timeline = timeline
                .with_current_step(checkpoint.report_step)
                .map_err(|e| AppError::Checkpoint {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            if timeline.done() {
                return Err(AppError::InvalidInput(format!(
                    "checkpoint {} is already at the end of the schedule",
                    path.display()
                )));
            }
            let run_kind = RunKind::Restart {
                report_step: checkpoint.report_step,
                suggested_step_s: restart.step(),
            };
            (checkpoint.state, restart, run_kind)
        }
        None => {
            let mut state = model.initial_state();
            state.time_s = timeline.start_time();
            (state, RestartHint::Default, RunKind::Fresh)
        }
    };

    let run_id = rf_results::compute_run_id(&case, &run_kind, &options.solver_version);

    // Restarted runs also depend on the checkpointed state, which the id does not cover.
    if options.use_cache && matches!(run_kind, RunKind::Fresh) {
        emit_progress(
            &mut progress_cb,
            RunStage::CheckingCache,
            started,
            None,
            None,
        );
        if store.has_run(&run_id) {
            emit_progress(
                &mut progress_cb,
                RunStage::LoadingCachedResult,
                started,
                Some("Loading cached run".to_string()),
                None,
            );
            let load_started = Instant::now();
            let manifest = store.load_manifest(&run_id)?;
            let summary = store.load_summary(&run_id)?;
            timing.load_cache_time_s = load_started.elapsed().as_secs_f64();
            timing.total_time_s = started.elapsed().as_secs_f64();

            emit_progress(
                &mut progress_cb,
                RunStage::Completed,
                started,
                Some("Loaded cached run".to_string()),
                None,
            );
            return Ok(RunResponse {
                run_dir: store.run_dir(&run_id),
                run_id,
                manifest,
                summary,
                loaded_from_cache: true,
                restart,
                timing,
            });
        }
    }

    let manifest = RunManifest {
        run_id: run_id.clone(),
        case_name: case.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        run_kind,
        solver_version: options.solver_version.clone(),
        num_report_steps: timeline.num_steps(),
        adaptive: case.stepping.adaptive,
    };
    let run_dir = store.begin_run(&manifest)?;
    let mut sink: StoreSink<ReservoirState> = StoreSink::open(&run_dir)?;

    let mut driver = ReportStepDriver::new(runtime.stepping.clone())?
        .with_events(runtime.events.clone())
        .with_tuning(runtime.tuning.clone())
        .with_restart(restart.clone());
    let mut subsystems = runtime.subsystems();
    let mut factory = |_: &ReservoirState| model.clone();

    emit_progress(
        &mut progress_cb,
        RunStage::RunningSchedule,
        started,
        None,
        None,
    );
    let solve_started = Instant::now();
    let report = driver.run_with_progress(
        &mut timeline,
        &mut state,
        &mut subsystems,
        &mut factory,
        &mut sink,
        |p: &SimProgress| {
            emit_progress(
                &mut progress_cb,
                RunStage::RunningSchedule,
                started,
                None,
                Some(ScheduleProgress::from(p)),
            );
        },
    )?;
    timing.solve_time_s = solve_started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::SavingResults,
        started,
        None,
        None,
    );
    let save_started = Instant::now();
    let summary = RunSummary {
        report: (&report).into(),
        failures: driver.failure_report().into(),
        final_elapsed_s: timeline.elapsed(),
    };
    store.save_summary(&run_id, &summary)?;
    timing.save_time_s = save_started.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    if !report.converged {
        tracing::warn!(
            run_id = %run_id,
            failed_substeps = report.failed_substeps,
            "run finished with abandoned report steps"
        );
    }

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some(format!("{} snapshots written", sink.snapshots_written())),
        None,
    );

    Ok(RunResponse {
        run_id,
        run_dir,
        manifest,
        summary,
        loaded_from_cache: false,
        restart,
        timing,
    })
}

fn load_checkpoint(path: &Path) -> AppResult<CheckpointRecord<ReservoirState>> {
    load_checkpoint_file(path).map_err(|e| AppError::Checkpoint {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Runs stored under `store_dir`, oldest first.
pub fn list_runs(store_dir: &Path, case_name: Option<&str>) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::new(store_dir.to_path_buf())?;
    Ok(store.list_runs(case_name)?)
}

/// Load manifest, summary and snapshots of a stored run.
pub fn load_run(store_dir: &Path, run_id: &str) -> AppResult<LoadedRun> {
    let store = RunStore::new(store_dir.to_path_buf())?;
    let manifest = store.load_manifest(run_id)?;
    let summary = if store.has_run(run_id) {
        Some(store.load_summary(run_id)?)
    } else {
        None
    };
    let snapshots = store.load_snapshots(run_id)?;
    Ok(LoadedRun {
        manifest,
        summary,
        snapshots,
    })
}
