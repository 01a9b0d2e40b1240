//! Query helpers for extracting data from loaded runs.

use rf_core::units::seconds_to_days;
use rf_models::{ReservoirState, WellControl};
use rf_results::SnapshotRecord;

use crate::error::{AppError, AppResult};

pub const VARIABLES: [&str; 6] = [
    "pressure",
    "bhp",
    "aquifer_pressure",
    "rate_target",
    "production",
    "influx",
];

/// Overview of a run's snapshot stream.
#[derive(Debug, Clone)]
pub struct SnapshotOverview {
    /// Elapsed days of the first and last snapshot
    pub time_range_days: (f64, f64),
    pub record_count: usize,
    pub final_pressure_bar: f64,
    pub cumulative_production_m3: f64,
    pub cumulative_influx_m3: f64,
    /// First report step that ended under BHP control
    pub bhp_switch_step: Option<usize>,
}

pub fn get_overview(records: &[SnapshotRecord<ReservoirState>]) -> AppResult<SnapshotOverview> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(AppError::InvalidInput("No snapshots in run".to_string()));
    };

    Ok(SnapshotOverview {
        time_range_days: (
            seconds_to_days(first.elapsed_s),
            seconds_to_days(last.elapsed_s),
        ),
        record_count: records.len(),
        final_pressure_bar: last.state.pressure_pa / 1.0e5,
        cumulative_production_m3: last.state.cumulative_production_m3,
        cumulative_influx_m3: last.state.cumulative_influx_m3,
        bhp_switch_step: records
            .iter()
            .find(|r| r.state.control == WellControl::Bhp)
            .map(|r| r.report_step),
    })
}

/// Time series of one state variable as (elapsed days, value in field units).
pub fn extract_series(
    records: &[SnapshotRecord<ReservoirState>],
    variable: &str,
) -> AppResult<Vec<(f64, f64)>> {
    let value: fn(&ReservoirState) -> f64 = match variable {
        "pressure" | "p_bar" => |s| s.pressure_pa / 1.0e5,
        "bhp" | "bhp_bar" => |s| s.bhp_pa / 1.0e5,
        "aquifer_pressure" => |s| s.aquifer_pressure_pa / 1.0e5,
        "rate_target" | "rate_m3_per_day" => |s| s.rate_target_m3_per_s * 86_400.0,
        "production" => |s| s.cumulative_production_m3,
        "influx" => |s| s.cumulative_influx_m3,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "Unknown variable: {} (expected one of {})",
                variable,
                VARIABLES.join(", ")
            )));
        }
    };

    Ok(records
        .iter()
        .map(|r| (seconds_to_days(r.elapsed_s), value(&r.state)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_models::ReservoirParams;

    fn record(step: usize, pressure_pa: f64, control: WellControl) -> SnapshotRecord<ReservoirState> {
        let mut state = ReservoirState::initial(&ReservoirParams::default(), None);
        state.pressure_pa = pressure_pa;
        state.control = control;
        state.cumulative_production_m3 = step as f64 * 100.0;
        SnapshotRecord {
            report_step: step,
            elapsed_s: step as f64 * 86_400.0,
            wall_time_s: 0.0,
            suggested_step_s: -1.0,
            state,
        }
    }

    #[test]
    fn overview_finds_bhp_switch() {
        let records = vec![
            record(0, 2.0e7, WellControl::Rate),
            record(1, 1.5e7, WellControl::Rate),
            record(2, 1.2e7, WellControl::Bhp),
        ];
        let overview = get_overview(&records).unwrap();
        assert_eq!(overview.record_count, 3);
        assert_eq!(overview.time_range_days, (0.0, 2.0));
        assert_eq!(overview.final_pressure_bar, 120.0);
        assert_eq!(overview.cumulative_production_m3, 200.0);
        assert_eq!(overview.bhp_switch_step, Some(2));
        assert!(get_overview(&[]).is_err());
    }

    #[test]
    fn series_in_field_units() {
        let records = vec![record(0, 2.0e7, WellControl::Rate), record(1, 1.5e7, WellControl::Rate)];
        let p = extract_series(&records, "pressure").unwrap();
        assert_eq!(p, vec![(0.0, 200.0), (1.0, 150.0)]);
        assert!(extract_series(&records, "temperature").is_err());
    }
}
