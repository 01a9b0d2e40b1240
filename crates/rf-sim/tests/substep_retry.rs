//! Retry exhaustion and rollback through the full driver.

use rf_sim::{
    MemorySink, NewtonReport, NonlinearModel, ReportStepDriver, SolveFailure, StepSizePolicy,
    SteppingConfig, Subsystems, Timeline,
};

/// Fails every attempt starting before `fail_until`, after scribbling on the state.
struct FailEarly {
    fail_until: f64,
}

impl NonlinearModel for FailEarly {
    type State = Vec<f64>;

    fn nonlinear_step(
        &mut self,
        state: &mut Vec<f64>,
        time: f64,
        dt: f64,
    ) -> Result<NewtonReport, SolveFailure> {
        state.push(dt);
        state[0] = f64::NAN;
        if time < self.fail_until {
            return Err(SolveFailure::NumericalBreakdown {
                iterations: 4,
                linear_iterations: 4,
                message: "negative pressure".to_string(),
            });
        }
        state[0] = time + dt;
        Ok(NewtonReport {
            iterations: 3,
            linear_iterations: 7,
        })
    }
}

fn config(max_retries: usize) -> SteppingConfig {
    SteppingConfig {
        terminal_output: false,
        initial_step: 4.0,
        policy: StepSizePolicy {
            min_step: 0.5,
            max_step: 10.0,
            max_retries,
            ..StepSizePolicy::default()
        },
        ..SteppingConfig::default()
    }
}

#[test]
fn exhausted_step_is_recorded_and_run_continues() {
    let mut timeline = Timeline::from_step_lengths(0.0, &[10.0, 10.0]).unwrap();
    let mut driver = ReportStepDriver::new(config(3)).unwrap();
    let mut state = vec![0.0];
    let mut factory = |_: &Vec<f64>| FailEarly { fail_until: 10.0 };
    let mut sink = MemorySink::default();

    let report = driver
        .run(
            &mut timeline,
            &mut state,
            &mut Subsystems::new(),
            &mut factory,
            &mut sink,
        )
        .unwrap();

    assert!(!report.converged);
    assert!(timeline.done());
    assert_eq!(driver.failure_report().failed_substeps, 3);
    assert_eq!(driver.failure_report().newton_iterations, 12);
    assert!(!driver.failure_report().converged);

    // The second report step still ran to its boundary.
    assert!(report.substeps >= 1);
    assert_eq!(state[0], 20.0);
    assert_eq!(sink.snapshots.len(), 3);
}

#[test]
fn failed_attempts_leave_state_untouched() {
    let mut timeline = Timeline::from_step_lengths(0.0, &[10.0]).unwrap();
    let mut driver = ReportStepDriver::new(config(5)).unwrap();
    let mut state = vec![1.25_f64, -3.5];
    let before: Vec<u64> = state.iter().map(|v| v.to_bits()).collect();
    let mut factory = |_: &Vec<f64>| FailEarly {
        fail_until: f64::INFINITY,
    };

    driver
        .run(
            &mut timeline,
            &mut state,
            &mut Subsystems::new(),
            &mut factory,
            &mut MemorySink::default(),
        )
        .unwrap();

    let after: Vec<u64> = state.iter().map(|v| v.to_bits()).collect();
    assert_eq!(before, after);
    let (total, failures) = driver.into_reports();
    assert_eq!(total.failed_substeps, 5);
    assert_eq!(failures.failed_substeps, 5);
    assert_eq!(failures.newton_iterations, 20);
    assert_eq!(failures.linear_iterations, 20);
    assert_eq!(total.substeps, 0);
}
