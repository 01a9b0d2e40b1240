//! Timing and convergence accounting.
//!
//! `SimulatorReport` is a plain value with an associative, commutative merge.
//! Durations are kept as `Duration` (integer nanoseconds) rather than float
//! seconds so that the merge law holds exactly, whatever the grouping.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::time::Duration;

use crate::solver::StepOutcome;

/// Aggregated statistics over any number of substep attempts.
///
/// The empty report (`Default`) is the merge identity: all counters zero and
/// `converged == true`. `converged` is false once any report step it covers
/// was abandoned after exhausting its retries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatorReport {
    /// Wall time spent inside solves
    pub solver_time: Duration,
    /// Wall time spent writing snapshots
    pub output_write_time: Duration,
    /// Wall time of the whole run
    pub total_time: Duration,
    pub converged: bool,
    /// Accepted substeps
    pub substeps: usize,
    /// Rejected substep attempts
    pub failed_substeps: usize,
    pub newton_iterations: usize,
    pub linear_iterations: usize,
}

impl Default for SimulatorReport {
    fn default() -> Self {
        Self {
            solver_time: Duration::ZERO,
            output_write_time: Duration::ZERO,
            total_time: Duration::ZERO,
            converged: true,
            substeps: 0,
            failed_substeps: 0,
            newton_iterations: 0,
            linear_iterations: 0,
        }
    }
}

impl SimulatorReport {
    /// Record of one substep attempt.
    pub fn from_attempt(outcome: &StepOutcome, solver_time: Duration) -> Self {
        let succeeded = outcome.succeeded();
        Self {
            solver_time,
            substeps: usize::from(succeeded),
            failed_substeps: usize::from(!succeeded),
            newton_iterations: outcome.iterations,
            linear_iterations: outcome.linear_iterations,
            ..Self::default()
        }
    }

    /// Marker merged in when a report step is abandoned.
    pub fn not_converged() -> Self {
        Self {
            converged: false,
            ..Self::default()
        }
    }

    pub fn output_write(elapsed: Duration) -> Self {
        Self {
            output_write_time: elapsed,
            ..Self::default()
        }
    }

    pub fn wall_time(elapsed: Duration) -> Self {
        Self {
            total_time: elapsed,
            ..Self::default()
        }
    }

    /// Field-wise sum, `converged` combined with AND.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            solver_time: self.solver_time + other.solver_time,
            output_write_time: self.output_write_time + other.output_write_time,
            total_time: self.total_time + other.total_time,
            converged: self.converged && other.converged,
            substeps: self.substeps + other.substeps,
            failed_substeps: self.failed_substeps + other.failed_substeps,
            newton_iterations: self.newton_iterations + other.newton_iterations,
            linear_iterations: self.linear_iterations + other.linear_iterations,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for SimulatorReport {
    type Output = SimulatorReport;

    fn add(self, rhs: Self) -> Self::Output {
        self.merge(&rhs)
    }
}

impl<'a> Add<&'a SimulatorReport> for SimulatorReport {
    type Output = SimulatorReport;

    fn add(self, rhs: &'a SimulatorReport) -> Self::Output {
        self.merge(rhs)
    }
}

impl Sum for SimulatorReport {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, r| acc.merge(&r))
    }
}

impl<'a> Sum<&'a SimulatorReport> for SimulatorReport {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, r| acc.merge(r))
    }
}

impl fmt::Display for SimulatorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total time (s):        {:.3}", self.total_time.as_secs_f64())?;
        writeln!(f, "Solver time (s):       {:.3}", self.solver_time.as_secs_f64())?;
        writeln!(
            f,
            "Output write time (s): {:.3}",
            self.output_write_time.as_secs_f64()
        )?;
        writeln!(f, "Substeps:              {}", self.substeps)?;
        writeln!(f, "Failed substeps:       {}", self.failed_substeps)?;
        writeln!(f, "Newton iterations:     {}", self.newton_iterations)?;
        writeln!(f, "Linear iterations:     {}", self.linear_iterations)?;
        write!(f, "Converged:             {}", self.converged)
    }
}
