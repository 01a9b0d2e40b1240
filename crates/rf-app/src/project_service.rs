//! Case loading, saving and introspection.

use std::path::Path;

use rf_core::units::seconds_to_days;
use rf_project::schema::Case;

use crate::error::{AppError, AppResult};

/// Summary of a case for listing and validation output.
#[derive(Debug, Clone)]
pub struct CaseSummary {
    pub name: String,
    pub well: String,
    pub report_steps: usize,
    pub total_days: f64,
    pub rate_changes: usize,
    pub tuning_entries: usize,
    pub adaptive: bool,
    pub has_aquifer: bool,
}

/// Load, migrate and validate a case file (`.yaml`, `.yml` or `.json`).
pub fn load_case(path: &Path) -> AppResult<Case> {
    if !path.exists() {
        return Err(AppError::CaseNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(rf_project::load_case(path)?)
}

/// Save by extension, validating first.
pub fn save_case(path: &Path, case: &Case) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => rf_project::save_json(path, case)?,
        _ => rf_project::save_yaml(path, case)?,
    }
    Ok(())
}

pub fn summarize_case(case: &Case) -> CaseSummary {
    let lengths = case.schedule.report_step_lengths_s();
    CaseSummary {
        name: case.name.clone(),
        well: case.well.name.clone(),
        report_steps: lengths.len(),
        total_days: seconds_to_days(lengths.iter().sum()),
        rate_changes: case
            .schedule
            .steps
            .iter()
            .filter(|s| s.rate_m3_per_day.is_some())
            .count(),
        tuning_entries: case
            .schedule
            .steps
            .iter()
            .filter(|s| s.tuning.is_some())
            .count(),
        adaptive: case.stepping.adaptive,
        has_aquifer: case.aquifer.is_some(),
    }
}
