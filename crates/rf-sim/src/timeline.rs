//! Report-step timeline.

use crate::error::{SimError, SimResult};

/// Ordered report-step boundaries and the current position among them.
///
/// Boundaries are absolute times in seconds. A timeline with `n + 1`
/// boundaries has `n` report steps; it is done once all of them have been
/// advanced over.
#[derive(Clone, Debug)]
pub struct Timeline {
    boundaries: Vec<f64>,
    current: usize,
}

impl Timeline {
    /// Build from absolute boundaries (start time first).
    pub fn new(boundaries: Vec<f64>) -> SimResult<Self> {
        if boundaries.len() < 2 {
            return Err(SimError::InvalidArg {
                what: "timeline needs at least two boundaries",
            });
        }
        if boundaries.iter().any(|t| !t.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "timeline boundaries must be finite",
            });
        }
        if boundaries.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SimError::InvalidArg {
                what: "timeline boundaries must be strictly increasing",
            });
        }
        Ok(Self {
            boundaries,
            current: 0,
        })
    }

    /// Build from a start time and report-step lengths.
    pub fn from_step_lengths(start: f64, lengths: &[f64]) -> SimResult<Self> {
        let mut boundaries = Vec::with_capacity(lengths.len() + 1);
        boundaries.push(start);
        let mut t = start;
        for &len in lengths {
            if !(len.is_finite() && len > 0.0) {
                return Err(SimError::InvalidArg {
                    what: "report step lengths must be positive",
                });
            }
            t += len;
            boundaries.push(t);
        }
        Self::new(boundaries)
    }

    /// Skip ahead to a report step, e.g. when resuming from a checkpoint.
    pub fn with_current_step(mut self, step: usize) -> SimResult<Self> {
        if step > self.num_steps() {
            return Err(SimError::InvalidArg {
                what: "restart step beyond end of timeline",
            });
        }
        self.current = step;
        Ok(self)
    }

    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn num_steps(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// True only before the first report step has been taken.
    pub fn initial_step(&self) -> bool {
        self.current == 0
    }

    pub fn done(&self) -> bool {
        self.current >= self.num_steps()
    }

    /// Start time of the whole timeline.
    pub fn start_time(&self) -> f64 {
        self.boundaries[0]
    }

    /// Absolute time at the current position.
    pub fn current_time(&self) -> f64 {
        self.boundaries[self.current]
    }

    /// Time elapsed since the start of the timeline.
    pub fn elapsed(&self) -> f64 {
        self.current_time() - self.start_time()
    }

    /// Length of the whole timeline.
    pub fn total_time(&self) -> f64 {
        self.boundaries[self.num_steps()] - self.start_time()
    }

    /// Length of the current report step. Zero once done.
    pub fn current_step_length(&self) -> f64 {
        if self.done() {
            0.0
        } else {
            self.boundaries[self.current + 1] - self.boundaries[self.current]
        }
    }

    /// Move to the next report step. Advancing a finished timeline is a no-op.
    pub fn advance(&mut self) {
        if !self.done() {
            self.current += 1;
        }
    }
}
