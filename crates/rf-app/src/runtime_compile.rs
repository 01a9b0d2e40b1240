//! Runtime compilation of a `Case` into driver inputs and model parameters.

use rf_core::units::{bar_to_pa, days_to_seconds};
use rf_models::{
    AquiferCoordinator, AquiferParams, ReservoirModel, ReservoirParams, ReservoirState,
    WellCoordinator, WellParams,
};
use rf_project::schema::{Case, EventDef, SteppingDef, TuningDef};
use rf_sim::{
    ScheduleEvent, ScheduleEvents, StepSizePolicy, SteppingConfig, Subsystems, Timeline,
    TuningParams, TuningTable,
};

use crate::error::{AppError, AppResult};

/// Everything needed to run a case, in SI units.
#[derive(Clone, Debug)]
pub struct CaseRuntime {
    pub timeline: Timeline,
    pub stepping: SteppingConfig,
    pub events: ScheduleEvents,
    pub tuning: TuningTable,
    pub reservoir: ReservoirParams,
    pub well: WellParams,
    pub aquifer: Option<AquiferParams>,
    /// (first report step, rate target in m³/s)
    pub rate_targets: Vec<(usize, f64)>,
}

impl CaseRuntime {
    pub fn model(&self) -> AppResult<ReservoirModel> {
        Ok(ReservoirModel::new(
            self.reservoir.clone(),
            self.well.clone(),
            self.aquifer.clone(),
        )?)
    }

    /// Well coordinator first, then the aquifer if present.
    pub fn subsystems(&self) -> Subsystems<ReservoirState> {
        let mut subsystems =
            Subsystems::new().with(WellCoordinator::new(self.rate_targets.iter().copied()));
        if let Some(aquifer) = &self.aquifer {
            subsystems.push(AquiferCoordinator::new(aquifer.clone()));
        }
        subsystems
    }
}

/// Compile a validated case.
pub fn compile_case(case: &Case) -> AppResult<CaseRuntime> {
    let lengths = case.schedule.report_step_lengths_s();
    let timeline =
        Timeline::from_step_lengths(days_to_seconds(case.schedule.start_day), &lengths)
            .map_err(|e| AppError::Compile(format!("schedule: {e}")))?;

    let stepping = stepping_config(&case.stepping);
    stepping
        .validate()
        .map_err(|e| AppError::Compile(format!("stepping: {e}")))?;

    let mut events = ScheduleEvents::new();
    let mut tuning = TuningTable::new();
    let mut rate_targets = Vec::new();

    for (step, first) in case
        .schedule
        .steps
        .iter()
        .zip(case.schedule.first_report_steps())
    {
        if let Some(rate) = step.rate_m3_per_s() {
            let event = if rate_targets.is_empty() {
                ScheduleEvent::NewWell
            } else {
                ScheduleEvent::ProductionUpdate
            };
            events.insert(first, event);
            rate_targets.push((first, rate));
        }
        for event in &step.events {
            events.insert(first, schedule_event(*event));
        }
        if let Some(def) = &step.tuning {
            tuning.insert(first, tuning_params(def));
            events.insert(first, ScheduleEvent::TuningChange);
        }
    }

    if !tuning.is_empty() && !stepping.use_event_driven_refresh {
        tracing::warn!(
            case = %case.name,
            "schedule has tuning entries but event_driven_refresh is off; they will be ignored"
        );
    }
    tuning
        .validate(&stepping.policy)
        .map_err(|e| AppError::Compile(e.to_string()))?;

    let reservoir = ReservoirParams {
        pore_volume_m3: case.reservoir.pore_volume_m3,
        total_compressibility_per_pa: case.reservoir.compressibility_per_pa(),
        reference_pressure_pa: case.reservoir.reference_pressure_pa(),
        initial_pressure_pa: case.reservoir.initial_pressure_pa(),
        min_pressure_pa: case.reservoir.min_pressure_pa(),
    };
    let well = WellParams {
        productivity_index: case.well.productivity_index_si(),
        bhp_min_pa: case.well.bhp_min_pa(),
    };
    let aquifer = case.aquifer.as_ref().map(|aq| AquiferParams {
        productivity_index: aq.productivity_index_si(),
        initial_pressure_pa: bar_to_pa(
            aq.initial_pressure_bar
                .unwrap_or(case.reservoir.initial_pressure_bar),
        ),
        max_influx_m3: aq.max_influx_m3,
    });

    tracing::debug!(
        case = %case.name,
        report_steps = timeline.num_steps(),
        rate_changes = rate_targets.len(),
        "case compiled"
    );

    Ok(CaseRuntime {
        timeline,
        stepping,
        events,
        tuning,
        reservoir,
        well,
        aquifer,
        rate_targets,
    })
}

fn stepping_config(def: &SteppingDef) -> SteppingConfig {
    SteppingConfig {
        adaptive_stepping: def.adaptive,
        use_event_driven_refresh: def.event_driven_refresh,
        terminal_output: def.terminal_output,
        initial_step: days_to_seconds(def.initial_step_days),
        step_after_event: def.step_after_event_days.map(days_to_seconds),
        policy: StepSizePolicy {
            min_step: days_to_seconds(def.min_step_days),
            max_step: days_to_seconds(def.max_step_days),
            growth_factor: def.growth_factor,
            shrink_factor: def.shrink_factor,
            max_retries: def.max_retries,
            final_step_tolerance: def.final_step_tolerance,
        },
    }
}

fn tuning_params(def: &TuningDef) -> TuningParams {
    TuningParams {
        min_step: def.min_step_days.map(days_to_seconds),
        max_step: def.max_step_days.map(days_to_seconds),
        growth_factor: def.growth_factor,
        shrink_factor: def.shrink_factor,
        max_retries: def.max_retries,
    }
}

fn schedule_event(event: EventDef) -> ScheduleEvent {
    match event {
        EventDef::NewWell => ScheduleEvent::NewWell,
        EventDef::ProductionUpdate => ScheduleEvent::ProductionUpdate,
        EventDef::InjectionUpdate => ScheduleEvent::InjectionUpdate,
        EventDef::WellStatusChange => ScheduleEvent::WellStatusChange,
    }
}
