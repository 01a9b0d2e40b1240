//! Schedule events and report-step indexed tuning.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::StepSizePolicy;
use crate::error::{SimError, SimResult};

/// Schedule event kinds that matter to time stepping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScheduleEvent {
    NewWell,
    ProductionUpdate,
    InjectionUpdate,
    WellStatusChange,
    TuningChange,
}

impl ScheduleEvent {
    pub const WELL_EVENTS: [ScheduleEvent; 4] = [
        ScheduleEvent::NewWell,
        ScheduleEvent::ProductionUpdate,
        ScheduleEvent::InjectionUpdate,
        ScheduleEvent::WellStatusChange,
    ];

    pub fn is_well_event(self) -> bool {
        Self::WELL_EVENTS.contains(&self)
    }
}

/// Answers whether an event is scheduled at a report step.
pub trait EventFeed {
    fn has_event(&self, event: ScheduleEvent, report_step: usize) -> bool;
}

/// True if any well event is scheduled at `report_step`.
pub fn well_event_at(feed: &dyn EventFeed, report_step: usize) -> bool {
    ScheduleEvent::WELL_EVENTS
        .iter()
        .any(|e| feed.has_event(*e, report_step))
}

/// Feed with no events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl EventFeed for NoEvents {
    fn has_event(&self, _event: ScheduleEvent, _report_step: usize) -> bool {
        false
    }
}

/// Events keyed by report step.
#[derive(Debug, Default, Clone)]
pub struct ScheduleEvents {
    by_step: BTreeMap<usize, BTreeSet<ScheduleEvent>>,
}

impl ScheduleEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, report_step: usize, event: ScheduleEvent) -> Self {
        self.insert(report_step, event);
        self
    }

    pub fn insert(&mut self, report_step: usize, event: ScheduleEvent) {
        self.by_step.entry(report_step).or_default().insert(event);
    }

    pub fn events_at(&self, report_step: usize) -> impl Iterator<Item = ScheduleEvent> + '_ {
        self.by_step
            .get(&report_step)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.by_step.is_empty()
    }
}

impl EventFeed for ScheduleEvents {
    fn has_event(&self, event: ScheduleEvent, report_step: usize) -> bool {
        self.by_step
            .get(&report_step)
            .is_some_and(|set| set.contains(&event))
    }
}

/// Partial override of a [`StepSizePolicy`]. Unset fields keep the base value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TuningParams {
    pub min_step: Option<f64>,
    pub max_step: Option<f64>,
    pub growth_factor: Option<f64>,
    pub shrink_factor: Option<f64>,
    pub max_retries: Option<usize>,
}

impl TuningParams {
    pub fn apply_to(&self, base: &StepSizePolicy) -> StepSizePolicy {
        StepSizePolicy {
            min_step: self.min_step.unwrap_or(base.min_step),
            max_step: self.max_step.unwrap_or(base.max_step),
            growth_factor: self.growth_factor.unwrap_or(base.growth_factor),
            shrink_factor: self.shrink_factor.unwrap_or(base.shrink_factor),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            final_step_tolerance: base.final_step_tolerance,
        }
    }
}

/// Tuning overrides keyed by the report step they take effect at.
#[derive(Clone, Debug, Default)]
pub struct TuningTable {
    entries: BTreeMap<usize, TuningParams>,
}

impl TuningTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, report_step: usize, params: TuningParams) -> Self {
        self.insert(report_step, params);
        self
    }

    pub fn insert(&mut self, report_step: usize, params: TuningParams) {
        self.entries.insert(report_step, params);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tuning in effect at `report_step`: the latest entry at or before it.
    pub fn at(&self, report_step: usize) -> Option<&TuningParams> {
        self.entries
            .range(..=report_step)
            .next_back()
            .map(|(_, params)| params)
    }

    /// Check that every entry yields a valid policy when applied to `base`.
    pub fn validate(&self, base: &StepSizePolicy) -> SimResult<()> {
        for (step, params) in &self.entries {
            params
                .apply_to(base)
                .validate()
                .map_err(|e| SimError::InvalidConfig {
                    what: format!("tuning at report step {step}: {e}"),
                })?;
        }
        Ok(())
    }

    /// Policy in effect at `report_step`, starting from `base`.
    pub fn policy_at(&self, base: &StepSizePolicy, report_step: usize) -> StepSizePolicy {
        match self.at(report_step) {
            Some(params) => params.apply_to(base),
            None => base.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_backed_feed() {
        let events = ScheduleEvents::new()
            .with(2, ScheduleEvent::ProductionUpdate)
            .with(2, ScheduleEvent::TuningChange)
            .with(5, ScheduleEvent::NewWell);

        assert!(events.has_event(ScheduleEvent::ProductionUpdate, 2));
        assert!(!events.has_event(ScheduleEvent::NewWell, 2));
        assert!(well_event_at(&events, 5));
        assert!(!well_event_at(&events, 3));
        assert_eq!(events.events_at(2).count(), 2);
        assert!(!well_event_at(&NoEvents, 0));
    }

    #[test]
    fn tuning_change_is_not_a_well_event() {
        let events = ScheduleEvents::new().with(1, ScheduleEvent::TuningChange);
        assert!(!well_event_at(&events, 1));
        assert!(!ScheduleEvent::TuningChange.is_well_event());
    }

    #[test]
    fn tuning_lookup_uses_latest_entry() {
        let table = TuningTable::new()
            .with(
                0,
                TuningParams {
                    max_step: Some(10.0),
                    ..TuningParams::default()
                },
            )
            .with(
                3,
                TuningParams {
                    growth_factor: Some(1.5),
                    ..TuningParams::default()
                },
            );
        let base = StepSizePolicy::default();

        assert_eq!(table.policy_at(&base, 2).max_step, 10.0);
        let later = table.policy_at(&base, 7);
        assert_eq!(later.growth_factor, 1.5);
        assert_eq!(later.max_step, base.max_step);
        assert_eq!(later.final_step_tolerance, base.final_step_tolerance);

        assert!(TuningTable::new().at(0).is_none());
        table.validate(&base).unwrap();
    }

    #[test]
    fn invalid_tuning_entry_is_reported_with_step() {
        let table = TuningTable::new().with(
            4,
            TuningParams {
                shrink_factor: Some(1.5),
                ..TuningParams::default()
            },
        );
        let err = table.validate(&StepSizePolicy::default()).unwrap_err();
        assert!(err.to_string().contains("report step 4"));
    }
}
