//! Case validation.

use crate::schema::{AquiferDef, Case, ReservoirDef, ScheduleDef, SteppingDef, TuningDef, WellDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Missing value: {field}")]
    Missing { field: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, v: f64) -> Result<(), ValidationError> {
    if !v.is_finite() || v <= 0.0 {
        return Err(invalid(field, v, "must be positive and finite"));
    }
    Ok(())
}

fn non_negative(field: &str, v: f64) -> Result<(), ValidationError> {
    if !v.is_finite() || v < 0.0 {
        return Err(invalid(field, v, "must be non-negative and finite"));
    }
    Ok(())
}

pub fn validate_case(case: &Case) -> Result<(), ValidationError> {
    if case.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }
    if case.name.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: "name".to_string(),
        });
    }

    validate_reservoir(&case.reservoir)?;
    validate_well(&case.well, &case.reservoir)?;
    if let Some(aquifer) = &case.aquifer {
        validate_aquifer(aquifer)?;
    }
    validate_stepping(&case.stepping)?;
    validate_schedule(&case.schedule)?;
    Ok(())
}

fn validate_reservoir(res: &ReservoirDef) -> Result<(), ValidationError> {
    positive("reservoir.pore_volume_m3", res.pore_volume_m3)?;
    positive("reservoir.compressibility_per_bar", res.compressibility_per_bar)?;
    positive("reservoir.min_pressure_bar", res.min_pressure_bar)?;
    positive("reservoir.initial_pressure_bar", res.initial_pressure_bar)?;
    if let Some(p) = res.reference_pressure_bar {
        positive("reservoir.reference_pressure_bar", p)?;
    }
    if res.initial_pressure_bar <= res.min_pressure_bar {
        return Err(invalid(
            "reservoir.initial_pressure_bar",
            res.initial_pressure_bar,
            "must exceed min_pressure_bar",
        ));
    }
    Ok(())
}

fn validate_well(well: &WellDef, res: &ReservoirDef) -> Result<(), ValidationError> {
    if well.name.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: "well.name".to_string(),
        });
    }
    positive("well.productivity_index", well.productivity_index)?;
    positive("well.bhp_min_bar", well.bhp_min_bar)?;
    if well.bhp_min_bar <= res.min_pressure_bar {
        return Err(invalid(
            "well.bhp_min_bar",
            well.bhp_min_bar,
            "must exceed reservoir.min_pressure_bar",
        ));
    }
    Ok(())
}

fn validate_aquifer(aq: &AquiferDef) -> Result<(), ValidationError> {
    positive("aquifer.productivity_index", aq.productivity_index)?;
    positive("aquifer.max_influx_m3", aq.max_influx_m3)?;
    if let Some(p) = aq.initial_pressure_bar {
        positive("aquifer.initial_pressure_bar", p)?;
    }
    Ok(())
}

fn validate_stepping(st: &SteppingDef) -> Result<(), ValidationError> {
    positive("stepping.initial_step_days", st.initial_step_days)?;
    positive("stepping.min_step_days", st.min_step_days)?;
    positive("stepping.max_step_days", st.max_step_days)?;
    if st.min_step_days > st.max_step_days {
        return Err(invalid(
            "stepping.min_step_days",
            st.min_step_days,
            "must not exceed max_step_days",
        ));
    }
    if !st.growth_factor.is_finite() || st.growth_factor < 1.0 {
        return Err(invalid("stepping.growth_factor", st.growth_factor, "must be >= 1"));
    }
    if !(st.shrink_factor > 0.0 && st.shrink_factor < 1.0) {
        return Err(invalid(
            "stepping.shrink_factor",
            st.shrink_factor,
            "must be in (0, 1)",
        ));
    }
    if st.max_retries == 0 {
        return Err(invalid("stepping.max_retries", 0, "must be at least 1"));
    }
    non_negative("stepping.final_step_tolerance", st.final_step_tolerance)?;
    if let Some(dt) = st.step_after_event_days {
        positive("stepping.step_after_event_days", dt)?;
    }
    Ok(())
}

fn validate_schedule(schedule: &ScheduleDef) -> Result<(), ValidationError> {
    if !schedule.start_day.is_finite() {
        return Err(invalid(
            "schedule.start_day",
            schedule.start_day,
            "must be finite",
        ));
    }
    if schedule.steps.is_empty() {
        return Err(ValidationError::Missing {
            field: "schedule.steps".to_string(),
        });
    }
    for (i, step) in schedule.steps.iter().enumerate() {
        positive(&format!("schedule.steps[{i}].length_days"), step.length_days)?;
        if step.repeat == 0 {
            return Err(invalid(
                format!("schedule.steps[{i}].repeat"),
                0,
                "must be at least 1",
            ));
        }
        if let Some(rate) = step.rate_m3_per_day {
            non_negative(&format!("schedule.steps[{i}].rate_m3_per_day"), rate)?;
        }
        if let Some(tuning) = &step.tuning {
            validate_tuning(tuning, i)?;
        }
    }
    Ok(())
}

fn validate_tuning(tuning: &TuningDef, i: usize) -> Result<(), ValidationError> {
    if let Some(v) = tuning.min_step_days {
        positive(&format!("schedule.steps[{i}].tuning.min_step_days"), v)?;
    }
    if let Some(v) = tuning.max_step_days {
        positive(&format!("schedule.steps[{i}].tuning.max_step_days"), v)?;
    }
    if let Some(v) = tuning.growth_factor
        && (!v.is_finite() || v < 1.0)
    {
        return Err(invalid(
            format!("schedule.steps[{i}].tuning.growth_factor"),
            v,
            "must be >= 1",
        ));
    }
    if let Some(v) = tuning.shrink_factor
        && !(v > 0.0 && v < 1.0)
    {
        return Err(invalid(
            format!("schedule.steps[{i}].tuning.shrink_factor"),
            v,
            "must be in (0, 1)",
        ));
    }
    if tuning.max_retries == Some(0) {
        return Err(invalid(
            format!("schedule.steps[{i}].tuning.max_retries"),
            0,
            "must be at least 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StepDef;

    fn case() -> Case {
        serde_yaml::from_str(
            r#"
version: 2
name: demo
reservoir:
  pore_volume_m3: 1.0e6
  compressibility_per_bar: 1.0e-4
  initial_pressure_bar: 200
well:
  name: P1
  productivity_index: 86.4
  bhp_min_bar: 100
schedule:
  steps:
    - length_days: 30
"#,
        )
        .unwrap()
    }

    #[test]
    fn minimal_case_is_valid() {
        validate_case(&case()).unwrap();
    }

    #[test]
    fn step_bounds_are_checked() {
        let mut c = case();
        c.stepping.min_step_days = 10.0;
        c.stepping.max_step_days = 1.0;
        let err = validate_case(&c).unwrap_err();
        assert!(err.to_string().contains("min_step_days"));
    }

    #[test]
    fn empty_schedule_is_missing() {
        let mut c = case();
        c.schedule.steps.clear();
        assert!(matches!(
            validate_case(&c),
            Err(ValidationError::Missing { .. })
        ));
    }

    #[test]
    fn bad_step_entries_are_reported_by_index() {
        let mut c = case();
        c.schedule.steps.push(StepDef {
            length_days: -1.0,
            repeat: 1,
            rate_m3_per_day: None,
            events: Vec::new(),
            tuning: None,
        });
        let err = validate_case(&c).unwrap_err();
        assert!(err.to_string().contains("steps[1]"));

        let mut c = case();
        c.schedule.steps[0].tuning = Some(TuningDef {
            shrink_factor: Some(2.0),
            ..TuningDef::default()
        });
        assert!(validate_case(&c).is_err());
    }

    #[test]
    fn bhp_limit_must_exceed_min_pressure() {
        let mut c = case();
        c.well.bhp_min_bar = 0.5;
        assert!(validate_case(&c).is_err());
    }

    #[test]
    fn future_version_rejected() {
        let mut c = case();
        c.version = 99;
        assert!(matches!(
            validate_case(&c),
            Err(ValidationError::UnsupportedVersion { version: 99 })
        ));
    }
}
