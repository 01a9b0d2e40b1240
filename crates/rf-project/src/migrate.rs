//! Case schema migration.

use crate::ProjectError;
use crate::schema::{Case, StepDef};

pub const LATEST_VERSION: u32 = 2;

pub fn migrate_to_latest(mut case: Case) -> Result<Case, ProjectError> {
    while case.version < LATEST_VERSION {
        case = migrate_one_version(case)?;
    }
    Ok(case)
}

fn migrate_one_version(case: Case) -> Result<Case, ProjectError> {
    match case.version {
        1 => migrate_v1_to_v2(case),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 1 listed report-step lengths flat; fold runs of equal lengths
/// into repeated step entries.
fn migrate_v1_to_v2(mut case: Case) -> Result<Case, ProjectError> {
    let legacy = std::mem::take(&mut case.schedule.report_steps_days);
    let mut steps: Vec<StepDef> = Vec::new();
    for length_days in legacy {
        match steps.last_mut() {
            Some(last) if last.length_days == length_days => last.repeat += 1,
            _ => steps.push(StepDef {
                length_days,
                repeat: 1,
                rate_m3_per_day: None,
                events: Vec::new(),
                tuning: None,
            }),
        }
    }
    steps.append(&mut case.schedule.steps);
    case.schedule.steps = steps;
    case.version = 2;
    Ok(case)
}
