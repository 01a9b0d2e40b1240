//! Boundary between the stepping core and the external nonlinear solve.
//!
//! The core only ever sees a [`StepOutcome`]. A [`NonlinearModel`] performs the
//! actual implicit step; [`SolverAdapter`] invokes it, classifies failures and
//! restores the state when an attempt is rejected.

use thiserror::Error;

/// Why a substep attempt was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// Iteration budget exhausted or the update stagnated
    NonConvergence,
    /// Singular system, non-finite or non-physical values
    NumericalBreakdown,
}

/// Result of one substep attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub iterations: usize,
    pub linear_iterations: usize,
    pub failure: Option<FailureReason>,
}

impl StepOutcome {
    pub fn converged(iterations: usize, linear_iterations: usize) -> Self {
        Self {
            iterations,
            linear_iterations,
            failure: None,
        }
    }

    pub fn failed(iterations: usize, linear_iterations: usize, reason: FailureReason) -> Self {
        Self {
            iterations,
            linear_iterations,
            failure: Some(reason),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Iteration counts reported by a converged nonlinear step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NewtonReport {
    pub iterations: usize,
    pub linear_iterations: usize,
}

/// A nonlinear step that did not produce an acceptable state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveFailure {
    #[error("nonlinear solve did not converge after {iterations} iterations: {message}")]
    NonConvergence {
        iterations: usize,
        linear_iterations: usize,
        message: String,
    },

    #[error("numerical breakdown after {iterations} iterations: {message}")]
    NumericalBreakdown {
        iterations: usize,
        linear_iterations: usize,
        message: String,
    },
}

impl SolveFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            SolveFailure::NonConvergence { .. } => FailureReason::NonConvergence,
            SolveFailure::NumericalBreakdown { .. } => FailureReason::NumericalBreakdown,
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            SolveFailure::NonConvergence { iterations, .. }
            | SolveFailure::NumericalBreakdown { iterations, .. } => *iterations,
        }
    }

    pub fn linear_iterations(&self) -> usize {
        match self {
            SolveFailure::NonConvergence {
                linear_iterations, ..
            }
            | SolveFailure::NumericalBreakdown {
                linear_iterations, ..
            } => *linear_iterations,
        }
    }

    /// Charge work done before the failing solve to this failure.
    pub fn add_work(&mut self, extra_iterations: usize, extra_linear: usize) {
        match self {
            SolveFailure::NonConvergence {
                iterations,
                linear_iterations,
                ..
            }
            | SolveFailure::NumericalBreakdown {
                iterations,
                linear_iterations,
                ..
            } => {
                *iterations += extra_iterations;
                *linear_iterations += extra_linear;
            }
        }
    }
}

impl From<rf_solver::SolverError> for SolveFailure {
    fn from(e: rf_solver::SolverError) -> Self {
        let message = e.to_string();
        match e {
            // One linear solve per Newton iteration.
            rf_solver::SolverError::ConvergenceFailed { iterations, .. } => {
                SolveFailure::NonConvergence {
                    iterations,
                    linear_iterations: iterations,
                    message,
                }
            }
            _ => SolveFailure::NumericalBreakdown {
                iterations: 0,
                linear_iterations: 0,
                message,
            },
        }
    }
}

/// External implicit model advanced one time increment at a time.
///
/// Implementations may leave `state` in any condition when they return an
/// error; [`SolverAdapter`] puts the pre-attempt state back. In a multi-rank
/// run the implementation is responsible for making the returned result
/// identical on every rank.
pub trait NonlinearModel {
    type State: Clone;

    /// Called once before the first substep of a report step.
    fn begin_report_step(&mut self, _state: &mut Self::State) {}

    /// Advance `state` from `time` to `time + dt`.
    fn nonlinear_step(
        &mut self,
        state: &mut Self::State,
        time: f64,
        dt: f64,
    ) -> Result<NewtonReport, SolveFailure>;

    /// Called once after the last substep of a report step.
    fn end_report_step(&mut self, _state: &mut Self::State) {}
}

/// Creates a fresh model instance for every report step.
pub trait SolverFactory<S> {
    type Model: NonlinearModel<State = S>;

    fn create_solver(&mut self, state: &S) -> Self::Model;
}

impl<S, M, F> SolverFactory<S> for F
where
    F: FnMut(&S) -> M,
    M: NonlinearModel<State = S>,
{
    type Model = M;

    fn create_solver(&mut self, state: &S) -> M {
        self(state)
    }
}

/// Wraps a [`NonlinearModel`] and turns each invocation into a [`StepOutcome`].
pub struct SolverAdapter<M: NonlinearModel> {
    model: M,
    attempts: usize,
    verbose: bool,
}

impl<M: NonlinearModel> SolverAdapter<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            attempts: 0,
            verbose: true,
        }
    }

    /// Log rejected attempts. Off on ranks other than the I/O rank.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_inner(self) -> M {
        self.model
    }

    /// Number of `solve` calls made through this adapter.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn begin_report_step(&mut self, state: &mut M::State) {
        self.model.begin_report_step(state);
    }

    pub fn end_report_step(&mut self, state: &mut M::State) {
        self.model.end_report_step(state);
    }

    /// Attempt one step of length `dt` starting at absolute time `time`.
    ///
    /// On failure `state` is restored to its value before the call.
    pub fn solve(&mut self, state: &mut M::State, time: f64, dt: f64) -> StepOutcome {
        self.attempts += 1;
        let checkpoint = state.clone();
        match self.model.nonlinear_step(state, time, dt) {
            Ok(report) => StepOutcome::converged(report.iterations, report.linear_iterations),
            Err(failure) => {
                *state = checkpoint;
                if self.verbose {
                    tracing::debug!(time, dt, %failure, "substep attempt rejected");
                }
                StepOutcome::failed(
                    failure.iterations(),
                    failure.linear_iterations(),
                    failure.reason(),
                )
            }
        }
    }
}
