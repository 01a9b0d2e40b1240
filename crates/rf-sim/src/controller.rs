//! Adaptive substep controller.
//!
//! Splits one report step into substeps, growing the step after accepted
//! solves and shrinking it after rejected ones, and always lands exactly on
//! the report-step boundary.

use rf_core::timing::StopWatch;

use crate::config::StepSizePolicy;
use crate::error::{SimError, SimResult};
use crate::report::SimulatorReport;
use crate::solver::StepOutcome;

/// One substep attempt handed to the solve callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Substep {
    /// Attempt counter within the report step (failed attempts included)
    pub index: usize,
    /// Offset of the substep start from the report-step start (s)
    pub offset: f64,
    /// Substep length (s)
    pub dt: f64,
}

/// Result of advancing one report step.
#[derive(Clone, Debug)]
pub struct StepReport {
    /// All attempts, successful and failed
    pub report: SimulatorReport,
    /// Failed attempts only
    pub failures: SimulatorReport,
    /// Accepted substep lengths in order
    pub substeps: Vec<f64>,
    /// Time reached within the report step; equals the duration unless exhausted
    pub elapsed: f64,
    /// Retries ran out before the boundary was reached
    pub exhausted: bool,
    pub suggested_next_step: f64,
}

impl StepReport {
    pub fn converged(&self) -> bool {
        !self.exhausted
    }
}

/// Holds the step-size policy and the suggestion carried between report steps.
#[derive(Clone, Debug)]
pub struct AdaptiveSubstepController {
    policy: StepSizePolicy,
    suggested: f64,
    verbose: bool,
}

impl AdaptiveSubstepController {
    /// Fails if the policy is inconsistent or the suggestion is not positive.
    pub fn new(policy: StepSizePolicy, initial_suggestion: f64) -> SimResult<Self> {
        policy.validate()?;
        if !(initial_suggestion.is_finite() && initial_suggestion > 0.0) {
            return Err(SimError::InvalidArg {
                what: "initial step suggestion must be positive",
            });
        }
        let suggested = policy.clamp(initial_suggestion);
        Ok(Self {
            policy,
            suggested,
            verbose: true,
        })
    }

    /// Emit per-attempt diagnostics. Off on ranks other than the I/O rank.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn policy(&self) -> &StepSizePolicy {
        &self.policy
    }

    pub fn suggested_next_step(&self) -> f64 {
        self.suggested
    }

    /// Override the suggestion (clamped to the policy bounds).
    pub fn set_suggested_next_step(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.suggested = self.policy.clamp(dt);
        }
    }

    /// Switch to a new policy, keeping the current suggestion within its bounds.
    pub fn update_tuning(&mut self, policy: StepSizePolicy) -> SimResult<()> {
        policy.validate()?;
        self.suggested = policy.clamp(self.suggested);
        self.policy = policy;
        Ok(())
    }

    /// Advance through a report step of length `duration`.
    ///
    /// `solve` performs one attempt and must leave the state untouched when it
    /// reports failure. Exhausting the retries is not an error: the returned
    /// report has `exhausted` set and `elapsed < duration`.
    pub fn advance<F>(&mut self, duration: f64, mut solve: F) -> SimResult<StepReport>
    where
        F: FnMut(Substep) -> StepOutcome,
    {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(SimError::InvalidArg {
                what: "report step duration must be positive",
            });
        }

        let policy = &self.policy;
        let verbose = self.verbose;
        let mut next = policy.clamp(self.suggested);
        let mut elapsed = 0.0;
        let mut consecutive_failures = 0;
        let mut index = 0;

        let mut report = SimulatorReport::default();
        let mut failures = SimulatorReport::default();
        let mut substeps = Vec::new();
        let mut exhausted = false;

        while elapsed < duration {
            let remaining = duration - elapsed;
            let is_final = next * (1.0 + policy.final_step_tolerance) >= remaining;
            let dt = if is_final { remaining } else { next.min(remaining) };

            let mut watch = StopWatch::started();
            let outcome = solve(Substep {
                index,
                offset: elapsed,
                dt,
            });
            let attempt = SimulatorReport::from_attempt(&outcome, watch.stop());
            index += 1;

            if outcome.succeeded() {
                report = report + attempt;
                substeps.push(dt);
                consecutive_failures = 0;
                elapsed = if dt >= remaining {
                    duration
                } else {
                    (elapsed + dt).min(duration)
                };
                next = (next * policy.growth_factor).min(policy.max_step);
                if verbose {
                    tracing::debug!(dt, elapsed, next, "substep accepted");
                }
            } else {
                report = report + &attempt;
                failures = failures + attempt;
                consecutive_failures += 1;
                next = policy.clamp(dt * policy.shrink_factor);
                if verbose {
                    tracing::debug!(
                        dt,
                        retry_dt = next,
                        failures = consecutive_failures,
                        reason = ?outcome.failure,
                        "substep rejected"
                    );
                }
                if consecutive_failures >= policy.max_retries {
                    exhausted = true;
                    break;
                }
            }
        }

        if exhausted {
            if verbose {
                tracing::warn!(
                    duration,
                    elapsed,
                    retries = consecutive_failures,
                    "report step abandoned after exhausting retries"
                );
            }
            report = report + SimulatorReport::not_converged();
            failures = failures + SimulatorReport::not_converged();
        }

        self.suggested = next;
        Ok(StepReport {
            report,
            failures,
            substeps,
            elapsed,
            exhausted,
            suggested_next_step: next,
        })
    }
}
