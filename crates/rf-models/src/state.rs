//! Reservoir state threaded through the stepping core.

use serde::{Deserialize, Serialize};

use crate::params::{AquiferParams, ReservoirParams};

/// Active well constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellControl {
    /// Producing at the scheduled rate target
    Rate,
    /// Producing at the bottom-hole pressure limit
    Bhp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservoirState {
    pub pressure_pa: f64,
    pub bhp_pa: f64,
    /// Updated by the aquifer coordinator at report-step start
    pub aquifer_pressure_pa: f64,
    /// Set by the well coordinator at report-step start (m³/s)
    pub rate_target_m3_per_s: f64,
    pub control: WellControl,
    pub cumulative_production_m3: f64,
    pub cumulative_influx_m3: f64,
    /// Absolute time of the last accepted substep end (s)
    pub time_s: f64,
}

impl ReservoirState {
    pub fn initial(reservoir: &ReservoirParams, aquifer: Option<&AquiferParams>) -> Self {
        Self {
            pressure_pa: reservoir.initial_pressure_pa,
            bhp_pa: reservoir.initial_pressure_pa,
            aquifer_pressure_pa: aquifer
                .map(|a| a.initial_pressure_pa)
                .unwrap_or(reservoir.initial_pressure_pa),
            rate_target_m3_per_s: 0.0,
            control: WellControl::Rate,
            cumulative_production_m3: 0.0,
            cumulative_influx_m3: 0.0,
            time_s: 0.0,
        }
    }
}
