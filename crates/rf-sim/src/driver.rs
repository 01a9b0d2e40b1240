//! Report-step driver: the top-level time loop.

use rf_core::timing::StopWatch;
use rf_core::units::seconds_to_days;

use crate::config::SteppingConfig;
use crate::controller::{AdaptiveSubstepController, StepReport};
use crate::error::{SimError, SimResult};
use crate::events::{EventFeed, NoEvents, ScheduleEvent, TuningTable, well_event_at};
use crate::output::{OutputSink, SnapshotInfo};
use crate::report::SimulatorReport;
use crate::restart::RestartHint;
use crate::solver::{NonlinearModel, SolverAdapter, SolverFactory};
use crate::subsystem::{ReportStepInfo, Subsystems};
use crate::timeline::Timeline;

/// Position of this process in a multi-rank run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankInfo {
    pub rank: usize,
    pub size: usize,
}

impl RankInfo {
    pub fn single() -> Self {
        Self { rank: 0, size: 1 }
    }

    /// Only the I/O rank prints.
    pub fn is_io_rank(&self) -> bool {
        self.rank == 0
    }
}

impl Default for RankInfo {
    fn default() -> Self {
        Self::single()
    }
}

/// Progress after each completed report step.
#[derive(Clone, Debug, PartialEq)]
pub struct SimProgress {
    /// Report steps completed so far
    pub report_step: usize,
    pub num_steps: usize,
    /// Simulated time since the start of the timeline (s)
    pub sim_time: f64,
    pub total_time: f64,
    pub fraction_complete: f64,
    pub substeps: usize,
    pub failed_substeps: usize,
    pub suggested_next_step: Option<f64>,
}

/// Runs a timeline to completion, one report step at a time.
pub struct ReportStepDriver {
    config: SteppingConfig,
    events: Box<dyn EventFeed>,
    tuning: TuningTable,
    restart: RestartHint,
    rank: RankInfo,
    report: SimulatorReport,
    failures: SimulatorReport,
}

impl ReportStepDriver {
    pub fn new(config: SteppingConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            events: Box::new(NoEvents),
            tuning: TuningTable::default(),
            restart: RestartHint::Default,
            rank: RankInfo::single(),
            report: SimulatorReport::default(),
            failures: SimulatorReport::default(),
        })
    }

    pub fn with_events(mut self, events: impl EventFeed + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    pub fn with_tuning(mut self, tuning: TuningTable) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_restart(mut self, restart: RestartHint) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_rank(mut self, rank: RankInfo) -> Self {
        self.rank = rank;
        self
    }

    pub fn config(&self) -> &SteppingConfig {
        &self.config
    }

    /// Everything accumulated so far.
    pub fn report(&self) -> &SimulatorReport {
        &self.report
    }

    /// Failed attempts accumulated so far.
    pub fn failure_report(&self) -> &SimulatorReport {
        &self.failures
    }

    /// (aggregate, failures)
    pub fn into_reports(self) -> (SimulatorReport, SimulatorReport) {
        (self.report, self.failures)
    }

    pub fn run<S, F, O>(
        &mut self,
        timeline: &mut Timeline,
        state: &mut S,
        subsystems: &mut Subsystems<S>,
        factory: &mut F,
        output: &mut O,
    ) -> SimResult<SimulatorReport>
    where
        S: Clone,
        F: SolverFactory<S>,
        O: OutputSink<S> + ?Sized,
    {
        self.run_with_progress(timeline, state, subsystems, factory, output, |_| {})
    }

    /// Like [`run`](Self::run), calling `progress` after every report step.
    pub fn run_with_progress<S, F, O, P>(
        &mut self,
        timeline: &mut Timeline,
        state: &mut S,
        subsystems: &mut Subsystems<S>,
        factory: &mut F,
        output: &mut O,
        mut progress: P,
    ) -> SimResult<SimulatorReport>
    where
        S: Clone,
        F: SolverFactory<S>,
        O: OutputSink<S> + ?Sized,
        P: FnMut(&SimProgress),
    {
        if timeline.done() {
            return Err(SimError::InvalidArg {
                what: "timeline has no report steps left",
            });
        }
        self.tuning.validate(&self.config.policy)?;

        let mut wall = StopWatch::started();
        let mut controller = self.build_controller(timeline.current_step())?;
        let verbose = self.verbose();

        if verbose {
            if let RestartHint::Degraded(diagnostic) = &self.restart {
                tracing::warn!(%diagnostic, "ignoring step suggestion from checkpoint");
            }
            tracing::info!(
                steps = timeline.num_steps() - timeline.current_step(),
                adaptive = self.config.adaptive_stepping,
                restart = ?self.restart,
                "starting simulation"
            );
        }

        while !timeline.done() {
            let info = ReportStepInfo {
                index: timeline.current_step(),
                start: timeline.current_time(),
                duration: timeline.current_step_length(),
            };

            subsystems.begin_report_step(state, &info);
            let mut adapter =
                SolverAdapter::new(factory.create_solver(state)).with_verbose(verbose);
            adapter.begin_report_step(state);

            if timeline.initial_step() {
                self.write_snapshot(output, state, timeline, &wall, None)?;
            }

            let step = match controller.as_mut() {
                Some(ctl) => {
                    self.refresh(ctl, info.index)?;
                    ctl.advance(info.duration, |sub| {
                        adapter.solve(state, info.start + sub.offset, sub.dt)
                    })?
                }
                None => single_solve(&mut adapter, state, &info, verbose),
            };

            adapter.end_report_step(state);
            subsystems.end_report_step(state);
            timeline.advance();

            let suggestion = controller.as_ref().map(|c| c.suggested_next_step());
            self.write_snapshot(output, state, timeline, &wall, suggestion)?;

            self.report = self.report.merge(&step.report);
            self.failures = self.failures.merge(&step.failures);

            if verbose {
                tracing::info!(
                    report_step = info.index,
                    time_days = seconds_to_days(timeline.elapsed()),
                    substeps = step.substeps.len(),
                    failed = step.failures.failed_substeps,
                    converged = step.converged(),
                    "report step complete"
                );
                tracing::debug!(
                    solver_s = step.report.solver_time.as_secs_f64(),
                    wall_s = wall.secs_since_start(),
                    "report step timing"
                );
            }

            progress(&SimProgress {
                report_step: timeline.current_step(),
                num_steps: timeline.num_steps(),
                sim_time: timeline.elapsed(),
                total_time: timeline.total_time(),
                fraction_complete: timeline.elapsed() / timeline.total_time(),
                substeps: self.report.substeps,
                failed_substeps: self.report.failed_substeps,
                suggested_next_step: suggestion,
            });
        }

        self.report = self
            .report
            .merge(&SimulatorReport::wall_time(wall.stop()));

        if verbose {
            tracing::info!(converged = self.report.converged, "simulation finished");
            tracing::debug!("\n{}", self.report);
        }

        Ok(self.report.clone())
    }

    /// Diagnostics are printed by the I/O rank only, and only with terminal output on.
    fn verbose(&self) -> bool {
        self.config.terminal_output && self.rank.is_io_rank()
    }

    fn build_controller(&self, first_step: usize) -> SimResult<Option<AdaptiveSubstepController>> {
        if !self.config.adaptive_stepping {
            return Ok(None);
        }
        let policy = if self.config.use_event_driven_refresh {
            self.tuning.policy_at(&self.config.policy, first_step)
        } else {
            self.config.policy.clone()
        };
        let initial = self.restart.step().unwrap_or(self.config.initial_step);
        AdaptiveSubstepController::new(policy, initial)
            .map(|ctl| Some(ctl.with_verbose(self.verbose())))
    }

    /// Apply tuning changes and well-event step resets scheduled at `report_step`.
    fn refresh(&self, ctl: &mut AdaptiveSubstepController, report_step: usize) -> SimResult<()> {
        if self.config.use_event_driven_refresh
            && self.events.has_event(ScheduleEvent::TuningChange, report_step)
        {
            let policy = self.tuning.policy_at(&self.config.policy, report_step);
            if self.verbose() {
                tracing::debug!(report_step, ?policy, "applying tuning change");
            }
            ctl.update_tuning(policy)?;
        }
        if let Some(dt) = self.config.step_after_event
            && well_event_at(self.events.as_ref(), report_step)
        {
            if self.verbose() {
                tracing::debug!(report_step, dt, "well event, resetting step suggestion");
            }
            ctl.set_suggested_next_step(dt);
        }
        Ok(())
    }

    fn write_snapshot<S, O>(
        &mut self,
        output: &mut O,
        state: &S,
        timeline: &Timeline,
        wall: &StopWatch,
        next_suggested_step: Option<f64>,
    ) -> SimResult<()>
    where
        O: OutputSink<S> + ?Sized,
    {
        let info = SnapshotInfo {
            report_step: timeline.current_step(),
            elapsed: timeline.elapsed(),
            is_substep: false,
            wall_time_s: wall.secs_since_start(),
            next_suggested_step,
        };
        let mut watch = StopWatch::started();
        output.write_snapshot(state, &info)?;
        self.report = self
            .report
            .merge(&SimulatorReport::output_write(watch.stop()));
        Ok(())
    }
}

/// One solve spanning the whole report step.
fn single_solve<M: NonlinearModel>(
    adapter: &mut SolverAdapter<M>,
    state: &mut M::State,
    info: &ReportStepInfo,
    verbose: bool,
) -> StepReport {
    let mut watch = StopWatch::started();
    let outcome = adapter.solve(state, info.start, info.duration);
    let attempt = SimulatorReport::from_attempt(&outcome, watch.stop());

    if outcome.succeeded() {
        StepReport {
            report: attempt,
            failures: SimulatorReport::default(),
            substeps: vec![info.duration],
            elapsed: info.duration,
            exhausted: false,
            suggested_next_step: info.duration,
        }
    } else {
        if verbose {
            tracing::warn!(
                report_step = info.index,
                reason = ?outcome.failure,
                "report step solve failed"
            );
        }
        let failed = attempt.merge(&SimulatorReport::not_converged());
        StepReport {
            report: failed.clone(),
            failures: failed,
            substeps: Vec::new(),
            elapsed: 0.0,
            exhausted: true,
            suggested_next_step: info.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;
    use crate::solver::{NewtonReport, SolveFailure};

    /// Adds dt to a counter; fails any step longer than `limit`.
    struct Accumulate {
        limit: f64,
    }

    impl NonlinearModel for Accumulate {
        type State = f64;

        fn nonlinear_step(
            &mut self,
            state: &mut f64,
            _time: f64,
            dt: f64,
        ) -> Result<NewtonReport, SolveFailure> {
            if dt > self.limit {
                return Err(SolveFailure::NonConvergence {
                    iterations: 10,
                    linear_iterations: 10,
                    message: "step too large".into(),
                });
            }
            *state += dt;
            Ok(NewtonReport {
                iterations: 2,
                linear_iterations: 2,
            })
        }
    }

    fn quiet() -> SteppingConfig {
        SteppingConfig {
            terminal_output: false,
            initial_step: 1.0,
            policy: crate::config::StepSizePolicy {
                min_step: 0.01,
                max_step: 100.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn rejects_finished_timeline() {
        let mut tl = Timeline::from_step_lengths(0.0, &[1.0]).unwrap();
        tl.advance();
        let mut driver = ReportStepDriver::new(quiet()).unwrap();
        let mut factory = |_: &f64| Accumulate { limit: 10.0 };
        let err = driver
            .run(
                &mut tl,
                &mut 0.0,
                &mut Subsystems::new(),
                &mut factory,
                &mut MemorySink::default(),
            )
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidArg { .. }));
    }

    #[test]
    fn invalid_config_is_fatal_at_construction() {
        let mut cfg = quiet();
        cfg.policy.min_step = 1000.0;
        assert!(matches!(
            ReportStepDriver::new(cfg),
            Err(SimError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn snapshots_per_report_step_plus_initial() {
        let mut tl = Timeline::from_step_lengths(0.0, &[5.0, 5.0, 5.0]).unwrap();
        let mut driver = ReportStepDriver::new(quiet()).unwrap();
        let mut sink = MemorySink::default();
        let mut state = 0.0;
        let mut factory = |_: &f64| Accumulate { limit: 10.0 };
        let report = driver
            .run(
                &mut tl,
                &mut state,
                &mut Subsystems::new(),
                &mut factory,
                &mut sink,
            )
            .unwrap();

        assert!(report.converged);
        assert!((state - 15.0).abs() < 1e-12);
        assert_eq!(sink.snapshots.len(), 4);
        let first = &sink.snapshots[0].1;
        assert_eq!(first.report_step, 0);
        assert_eq!(first.next_suggested_step, None);
        let last = &sink.snapshots[3].1;
        assert_eq!(last.report_step, 3);
        assert_eq!(last.elapsed, 15.0);
        assert!(last.next_suggested_step.is_some());
        assert!(sink.snapshots.iter().all(|(_, i)| !i.is_substep));
    }

    #[test]
    fn restart_skips_initial_snapshot_and_seeds_step() {
        let mut tl = Timeline::from_step_lengths(0.0, &[5.0, 5.0, 5.0])
            .unwrap()
            .with_current_step(1)
            .unwrap();
        let mut driver = ReportStepDriver::new(quiet())
            .unwrap()
            .with_restart(RestartHint::Resume(2.5));
        let mut sink = MemorySink::default();
        let mut steps_after_first = None;
        let mut factory = |_: &f64| Accumulate { limit: 10.0 };
        driver
            .run_with_progress(
                &mut tl,
                &mut 5.0,
                &mut Subsystems::new(),
                &mut factory,
                &mut sink,
                |p| {
                    steps_after_first.get_or_insert(p.substeps);
                },
            )
            .unwrap();

        assert_eq!(sink.snapshots.len(), 2);
        assert_eq!(sink.snapshots[0].1.report_step, 2);
        // 2.5 then the 2.5 remainder
        assert_eq!(steps_after_first, Some(2));
    }

    #[test]
    fn non_adaptive_does_one_solve_per_step() {
        let mut cfg = quiet();
        cfg.adaptive_stepping = false;
        let mut tl = Timeline::from_step_lengths(0.0, &[5.0, 50.0, 5.0]).unwrap();
        let mut driver = ReportStepDriver::new(cfg).unwrap();
        let mut sink = MemorySink::default();
        let mut state = 0.0;
        let mut factory = |_: &f64| Accumulate { limit: 10.0 };
        let report = driver
            .run(
                &mut tl,
                &mut state,
                &mut Subsystems::new(),
                &mut factory,
                &mut sink,
            )
            .unwrap();

        assert!(!report.converged);
        assert_eq!(report.substeps, 2);
        assert_eq!(report.failed_substeps, 1);
        assert_eq!(driver.failure_report().failed_substeps, 1);
        assert_eq!(state, 10.0);
        assert!(sink.snapshots.iter().all(|(_, i)| i.next_suggested_step.is_none()));
    }

    #[test]
    fn well_event_resets_suggestion() {
        let mut cfg = quiet();
        cfg.step_after_event = Some(0.5);
        cfg.policy.growth_factor = 2.0;
        let events = crate::events::ScheduleEvents::new().with(1, ScheduleEvent::NewWell);
        let mut driver = ReportStepDriver::new(cfg).unwrap().with_events(events);

        let mut tl = Timeline::from_step_lengths(0.0, &[8.0, 8.0]).unwrap();
        let mut times = Vec::new();
        let mut factory = |_: &f64| Accumulate { limit: 100.0 };
        let mut sink = MemorySink::default();
        let mut state = 0.0;
        driver
            .run_with_progress(
                &mut tl,
                &mut state,
                &mut Subsystems::new(),
                &mut factory,
                &mut sink,
                |p| times.push(p.substeps),
            )
            .unwrap();

        // step 0: 1, 2, 4, 1 (remainder) ; step 1 restarts at 0.5: 0.5, 1, 2, 4, 0.5
        assert_eq!(times, vec![4, 9]);
    }

    /// Records the length of every accepted substep.
    struct RecordDt;

    impl NonlinearModel for RecordDt {
        type State = Vec<f64>;

        fn nonlinear_step(
            &mut self,
            state: &mut Vec<f64>,
            _time: f64,
            dt: f64,
        ) -> Result<NewtonReport, SolveFailure> {
            state.push(dt);
            Ok(NewtonReport::default())
        }
    }

    /// Accepted substep lengths of a two report step run with a tuning change at step 1.
    fn substeps_with_tuning_change(event_driven_refresh: bool) -> (Vec<f64>, Vec<f64>) {
        let mut cfg = quiet();
        cfg.use_event_driven_refresh = event_driven_refresh;
        cfg.policy.growth_factor = 2.0;
        let events = crate::events::ScheduleEvents::new().with(1, ScheduleEvent::TuningChange);
        let tuning = TuningTable::new().with(
            1,
            crate::events::TuningParams {
                max_step: Some(2.0),
                ..Default::default()
            },
        );
        let mut driver = ReportStepDriver::new(cfg)
            .unwrap()
            .with_events(events)
            .with_tuning(tuning);

        let mut tl = Timeline::from_step_lengths(0.0, &[20.0, 20.0]).unwrap();
        let mut state = Vec::new();
        let mut first_step_len = 0;
        let mut factory = |_: &Vec<f64>| RecordDt;
        driver
            .run_with_progress(
                &mut tl,
                &mut state,
                &mut Subsystems::new(),
                &mut factory,
                &mut MemorySink::default(),
                |p| {
                    if p.report_step == 1 {
                        first_step_len = p.substeps;
                    }
                },
            )
            .unwrap();
        let second = state.split_off(first_step_len);
        (state, second)
    }

    #[test]
    fn tuning_change_caps_later_substeps() {
        let (first, second) = substeps_with_tuning_change(true);
        assert_eq!(first, vec![1.0, 2.0, 4.0, 8.0, 5.0]);
        assert_eq!(second, vec![2.0; 10]);
    }

    #[test]
    fn tuning_table_ignored_without_event_driven_refresh() {
        let (first, second) = substeps_with_tuning_change(false);
        assert_eq!(first, vec![1.0, 2.0, 4.0, 8.0, 5.0]);
        // The suggestion carried over from step 0 covers step 1 in one go.
        assert_eq!(second, vec![20.0]);
    }

    mod diagnostics {
        use super::*;
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tracing_subscriber::layer::{Context, SubscriberExt};

        #[derive(Clone, Default)]
        struct EventCount(Arc<AtomicUsize>);

        impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCount {
            fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        /// Events logged by a run whose only report step exhausts its retries.
        fn events_logged(rank: RankInfo, terminal_output: bool, adaptive: bool) -> usize {
            let counter = EventCount::default();
            let subscriber = tracing_subscriber::registry().with(counter.clone());
            tracing::subscriber::with_default(subscriber, || {
                let mut cfg = quiet();
                cfg.terminal_output = terminal_output;
                cfg.adaptive_stepping = adaptive;
                cfg.policy.max_retries = 2;
                let mut driver = ReportStepDriver::new(cfg)
                    .unwrap()
                    .with_rank(rank)
                    .with_restart(RestartHint::Degraded(
                        crate::restart::RestartDiagnostic::MissingField,
                    ));
                let mut tl = Timeline::from_step_lengths(0.0, &[5.0]).unwrap();
                let mut factory = |_: &f64| Accumulate { limit: 0.1 };
                driver
                    .run(
                        &mut tl,
                        &mut 0.0,
                        &mut Subsystems::new(),
                        &mut factory,
                        &mut MemorySink::default(),
                    )
                    .unwrap();
            });
            counter.0.load(Ordering::SeqCst)
        }

        #[test]
        fn only_io_rank_logs() {
            let other = RankInfo { rank: 1, size: 2 };
            for adaptive in [true, false] {
                assert_eq!(events_logged(other, true, adaptive), 0);
                assert!(events_logged(RankInfo::single(), true, adaptive) > 0);
            }
        }

        #[test]
        fn terminal_output_off_silences_io_rank() {
            for adaptive in [true, false] {
                assert_eq!(events_logged(RankInfo::single(), false, adaptive), 0);
            }
        }
    }
}
