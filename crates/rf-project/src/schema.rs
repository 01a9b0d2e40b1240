//! Case file schema.
//!
//! Case files use field units: days, bar, m³/day. Conversion to SI happens
//! in the accessors on each definition.

use rf_core::units::{bar_to_pa, days_to_seconds, m3_per_day_to_m3_per_s, per_bar_to_per_pa};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub reservoir: ReservoirDef,
    pub well: WellDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aquifer: Option<AquiferDef>,
    #[serde(default)]
    pub stepping: SteppingDef,
    #[serde(default)]
    pub schedule: ScheduleDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservoirDef {
    pub pore_volume_m3: f64,
    pub compressibility_per_bar: f64,
    pub initial_pressure_bar: f64,
    /// Defaults to the initial pressure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_pressure_bar: Option<f64>,
    #[serde(default = "default_min_pressure_bar")]
    pub min_pressure_bar: f64,
}

fn default_min_pressure_bar() -> f64 {
    1.0
}

impl ReservoirDef {
    pub fn initial_pressure_pa(&self) -> f64 {
        bar_to_pa(self.initial_pressure_bar)
    }

    pub fn reference_pressure_pa(&self) -> f64 {
        bar_to_pa(
            self.reference_pressure_bar
                .unwrap_or(self.initial_pressure_bar),
        )
    }

    pub fn min_pressure_pa(&self) -> f64 {
        bar_to_pa(self.min_pressure_bar)
    }

    pub fn compressibility_per_pa(&self) -> f64 {
        per_bar_to_per_pa(self.compressibility_per_bar)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WellDef {
    pub name: String,
    /// m³/day per bar of drawdown
    pub productivity_index: f64,
    pub bhp_min_bar: f64,
}

impl WellDef {
    /// m³/s per Pa
    pub fn productivity_index_si(&self) -> f64 {
        per_bar_to_per_pa(m3_per_day_to_m3_per_s(self.productivity_index))
    }

    pub fn bhp_min_pa(&self) -> f64 {
        bar_to_pa(self.bhp_min_bar)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AquiferDef {
    /// m³/day per bar
    pub productivity_index: f64,
    /// Defaults to the reservoir initial pressure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_pressure_bar: Option<f64>,
    pub max_influx_m3: f64,
}

impl AquiferDef {
    pub fn productivity_index_si(&self) -> f64 {
        per_bar_to_per_pa(m3_per_day_to_m3_per_s(self.productivity_index))
    }
}

/// Time-stepping options. Durations in days.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SteppingDef {
    pub adaptive: bool,
    pub event_driven_refresh: bool,
    pub terminal_output: bool,
    pub initial_step_days: f64,
    pub min_step_days: f64,
    pub max_step_days: f64,
    pub growth_factor: f64,
    pub shrink_factor: f64,
    pub max_retries: usize,
    pub final_step_tolerance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_after_event_days: Option<f64>,
}

impl Default for SteppingDef {
    fn default() -> Self {
        Self {
            adaptive: true,
            event_driven_refresh: false,
            terminal_output: true,
            initial_step_days: 1.0,
            min_step_days: 1.0e-6,
            max_step_days: 365.0,
            growth_factor: 3.0,
            shrink_factor: 0.33,
            max_retries: 10,
            final_step_tolerance: 0.05,
            step_after_event_days: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScheduleDef {
    #[serde(default)]
    pub start_day: f64,
    #[serde(default)]
    pub steps: Vec<StepDef>,
    /// Version 1 flat list of report-step lengths, folded into `steps` on load
    #[serde(default, skip_serializing)]
    pub report_steps_days: Vec<f64>,
}

impl ScheduleDef {
    /// Report-step lengths in seconds, repeats expanded.
    pub fn report_step_lengths_s(&self) -> Vec<f64> {
        self.steps
            .iter()
            .flat_map(|s| std::iter::repeat_n(days_to_seconds(s.length_days), s.repeat))
            .collect()
    }

    /// Index of the first report step of each entry.
    pub fn first_report_steps(&self) -> Vec<usize> {
        self.steps
            .iter()
            .scan(0, |next, s| {
                let first = *next;
                *next += s.repeat;
                Some(first)
            })
            .collect()
    }

    pub fn num_report_steps(&self) -> usize {
        self.steps.iter().map(|s| s.repeat).sum()
    }
}

/// One or more report steps of equal length. Rate, events and tuning apply
/// from the first of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDef {
    pub length_days: f64,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
    /// New well rate target (m³/day); implies a production update event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_m3_per_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuning: Option<TuningDef>,
}

fn default_repeat() -> usize {
    1
}

impl StepDef {
    pub fn rate_m3_per_s(&self) -> Option<f64> {
        self.rate_m3_per_day.map(m3_per_day_to_m3_per_s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventDef {
    NewWell,
    ProductionUpdate,
    InjectionUpdate,
    WellStatusChange,
}

/// Stepping overrides from a report step onward. Durations in days.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TuningDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_step_days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_step_days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shrink_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<usize>,
}
