//! Persisted record types.

use std::collections::BTreeMap;

use rf_sim::{RestartHint, RestartValues, SUGGESTED_STEP_KEY, SimulatorReport, SnapshotInfo};
use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub case_name: String,
    pub timestamp: String,
    pub run_kind: RunKind,
    pub solver_version: String,
    pub num_report_steps: usize,
    pub adaptive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RunKind {
    Fresh,
    /// Resumed at `report_step` from a checkpoint
    Restart {
        report_step: usize,
        suggested_step_s: Option<f64>,
    },
}

/// One line of `snapshots.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotRecord<S> {
    pub report_step: usize,
    pub elapsed_s: f64,
    pub wall_time_s: f64,
    /// `-1` when no suggestion was available
    pub suggested_step_s: f64,
    pub state: S,
}

impl<S: Clone> SnapshotRecord<S> {
    pub fn new(state: &S, info: &SnapshotInfo) -> Self {
        Self {
            report_step: info.report_step,
            elapsed_s: info.elapsed,
            wall_time_s: info.wall_time_s,
            suggested_step_s: info.suggested_step_or_sentinel(),
            state: state.clone(),
        }
    }
}

/// Latest restartable state of a run (`checkpoint.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointRecord<S> {
    pub report_step: usize,
    pub elapsed_s: f64,
    pub state: S,
    /// Auxiliary values keyed by name, e.g. the suggested next step
    #[serde(default)]
    pub extra: BTreeMap<String, Vec<f64>>,
}

impl<S: Clone> CheckpointRecord<S> {
    pub fn new(state: &S, info: &SnapshotInfo) -> Self {
        let mut extra = BTreeMap::new();
        extra.insert(
            SUGGESTED_STEP_KEY.to_string(),
            vec![info.next_suggested_step.unwrap_or(RestartHint::SENTINEL)],
        );
        Self {
            report_step: info.report_step,
            elapsed_s: info.elapsed,
            state: state.clone(),
            extra,
        }
    }
}

impl<S> RestartValues for CheckpointRecord<S> {
    fn extra(&self, key: &str) -> Option<&[f64]> {
        self.extra.get(key).map(Vec::as_slice)
    }
}

/// Flattened [`SimulatorReport`] with times in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReportSummary {
    pub converged: bool,
    pub substeps: usize,
    pub failed_substeps: usize,
    pub newton_iterations: usize,
    pub linear_iterations: usize,
    pub solver_time_s: f64,
    pub output_write_time_s: f64,
    pub total_time_s: f64,
}

impl From<&SimulatorReport> for ReportSummary {
    fn from(r: &SimulatorReport) -> Self {
        Self {
            converged: r.converged,
            substeps: r.substeps,
            failed_substeps: r.failed_substeps,
            newton_iterations: r.newton_iterations,
            linear_iterations: r.linear_iterations,
            solver_time_s: r.solver_time.as_secs_f64(),
            output_write_time_s: r.output_write_time.as_secs_f64(),
            total_time_s: r.total_time.as_secs_f64(),
        }
    }
}

/// `summary.json`: the run's aggregate and failure reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub report: ReportSummary,
    pub failures: ReportSummary,
    pub final_elapsed_s: f64,
}
