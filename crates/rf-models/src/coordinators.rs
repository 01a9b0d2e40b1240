//! Well and aquifer coordinators notified at report-step boundaries.

use std::collections::BTreeMap;

use rf_sim::{ReportStepInfo, Subsystem};

use crate::params::AquiferParams;
use crate::state::ReservoirState;

/// Applies the scheduled rate target and tracks per-step production.
#[derive(Clone, Debug, Default)]
pub struct WellCoordinator {
    /// Rate target (m³/s) taking effect at each report step
    targets: BTreeMap<usize, f64>,
    produced_at_step_start: f64,
    report_step: usize,
}

impl WellCoordinator {
    pub fn new(targets: impl IntoIterator<Item = (usize, f64)>) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Latest target at or before `report_step`; zero (shut in) before the first.
    pub fn target_at(&self, report_step: usize) -> f64 {
        self.targets
            .range(..=report_step)
            .next_back()
            .map_or(0.0, |(_, q)| *q)
    }
}

impl Subsystem<ReservoirState> for WellCoordinator {
    fn name(&self) -> &str {
        "well"
    }

    fn begin_report_step(&mut self, state: &mut ReservoirState, step: &ReportStepInfo) {
        state.rate_target_m3_per_s = self.target_at(step.index);
        self.produced_at_step_start = state.cumulative_production_m3;
        self.report_step = step.index;
    }

    fn end_report_step(&mut self, state: &mut ReservoirState) {
        tracing::debug!(
            report_step = self.report_step,
            produced_m3 = state.cumulative_production_m3 - self.produced_at_step_start,
            control = ?state.control,
            bhp_pa = state.bhp_pa,
            "well step summary"
        );
    }
}

/// Fetkovich aquifer: pressure follows cumulative influx.
#[derive(Clone, Debug)]
pub struct AquiferCoordinator {
    params: AquiferParams,
    influx_at_step_start: f64,
}

impl AquiferCoordinator {
    pub fn new(params: AquiferParams) -> Self {
        Self {
            params,
            influx_at_step_start: 0.0,
        }
    }
}

impl Subsystem<ReservoirState> for AquiferCoordinator {
    fn name(&self) -> &str {
        "aquifer"
    }

    fn begin_report_step(&mut self, state: &mut ReservoirState, _step: &ReportStepInfo) {
        state.aquifer_pressure_pa = self.params.pressure_after(state.cumulative_influx_m3);
        self.influx_at_step_start = state.cumulative_influx_m3;
    }

    fn end_report_step(&mut self, state: &mut ReservoirState) {
        tracing::debug!(
            influx_m3 = state.cumulative_influx_m3 - self.influx_at_step_start,
            aquifer_pressure_pa = state.aquifer_pressure_pa,
            "aquifer step summary"
        );
    }
}
