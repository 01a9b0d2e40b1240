//! Time-stepping configuration.
//!
//! All durations are in seconds.

use crate::error::{SimError, SimResult};
use rf_core::units::days_to_seconds;

/// Bounds and factors that govern substep sizing.
#[derive(Clone, Debug, PartialEq)]
pub struct StepSizePolicy {
    /// Smallest step the controller will suggest (s)
    pub min_step: f64,
    /// Largest step the controller will suggest (s)
    pub max_step: f64,
    /// Multiplier applied to the suggestion after an accepted substep (>= 1)
    pub growth_factor: f64,
    /// Multiplier applied to a failed substep length before retrying, in (0, 1)
    pub shrink_factor: f64,
    /// Consecutive failed attempts that abandon the report step
    pub max_retries: usize,
    /// Relative slack under which the remainder of a report step is taken in
    /// one substep instead of leaving a short trailing substep. That final
    /// substep may exceed `max_step` by at most this fraction.
    pub final_step_tolerance: f64,
}

impl Default for StepSizePolicy {
    fn default() -> Self {
        Self {
            min_step: days_to_seconds(1.0e-6),
            max_step: days_to_seconds(365.0),
            growth_factor: 3.0,
            shrink_factor: 0.33,
            max_retries: 10,
            final_step_tolerance: 0.05,
        }
    }
}

impl StepSizePolicy {
    /// Reject policies that can never produce a valid step plan.
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |what: String| Err(SimError::InvalidConfig { what });

        if !(self.min_step.is_finite() && self.min_step > 0.0) {
            return invalid(format!("min_step must be positive, got {}", self.min_step));
        }
        if !(self.max_step.is_finite() && self.max_step > 0.0) {
            return invalid(format!("max_step must be positive, got {}", self.max_step));
        }
        if self.min_step > self.max_step {
            return invalid(format!(
                "min_step ({}) exceeds max_step ({})",
                self.min_step, self.max_step
            ));
        }
        if !(self.growth_factor.is_finite() && self.growth_factor >= 1.0) {
            return invalid(format!(
                "growth_factor must be >= 1, got {}",
                self.growth_factor
            ));
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return invalid(format!(
                "shrink_factor must be in (0, 1), got {}",
                self.shrink_factor
            ));
        }
        if self.max_retries == 0 {
            return invalid("max_retries must be at least 1".to_string());
        }
        if !(self.final_step_tolerance.is_finite() && self.final_step_tolerance >= 0.0) {
            return invalid(format!(
                "final_step_tolerance must be non-negative, got {}",
                self.final_step_tolerance
            ));
        }
        Ok(())
    }

    /// Clamp a step into `[min_step, max_step]`.
    pub fn clamp(&self, dt: f64) -> f64 {
        rf_core::clamp_to(dt, self.min_step, self.max_step)
    }
}

/// Options for a report-step driven run.
#[derive(Clone, Debug)]
pub struct SteppingConfig {
    /// Sub-step report steps adaptively; otherwise one solve per report step
    pub adaptive_stepping: bool,
    /// Re-apply the tuning table when a tuning-change event is scheduled
    pub use_event_driven_refresh: bool,
    /// Emit per-report-step log lines (I/O rank only)
    pub terminal_output: bool,
    /// Suggested first step when no restart hint is available (s)
    pub initial_step: f64,
    /// Suggestion imposed after a well event, if set (s)
    pub step_after_event: Option<f64>,
    pub policy: StepSizePolicy,
}

impl Default for SteppingConfig {
    fn default() -> Self {
        Self {
            adaptive_stepping: true,
            use_event_driven_refresh: false,
            terminal_output: true,
            initial_step: days_to_seconds(1.0),
            step_after_event: None,
            policy: StepSizePolicy::default(),
        }
    }
}

impl SteppingConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.policy.validate()?;
        if !(self.initial_step.is_finite() && self.initial_step > 0.0) {
            return Err(SimError::InvalidConfig {
                what: format!("initial_step must be positive, got {}", self.initial_step),
            });
        }
        if let Some(dt) = self.step_after_event
            && !(dt.is_finite() && dt > 0.0)
        {
            return Err(SimError::InvalidConfig {
                what: format!("step_after_event must be positive, got {dt}"),
            });
        }
        Ok(())
    }
}
