//! Lightweight wall-clock timing utilities.
//!
//! `StopWatch` accumulates across start/stop pairs and reports as a
//! `Duration`, which keeps downstream sums exact. `Timer` is a one-shot
//! scoped measurement that logs through `tracing`.

use std::time::{Duration, Instant};

/// Accumulating stopwatch.
#[derive(Debug, Clone, Default)]
pub struct StopWatch {
    running_since: Option<Instant>,
    accumulated: Duration,
}

impl StopWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stopwatch that is already running.
    pub fn started() -> Self {
        let mut sw = Self::new();
        sw.start();
        sw
    }

    /// Start (or restart) the current lap. Previously accumulated time is kept.
    pub fn start(&mut self) {
        self.running_since = Some(Instant::now());
    }

    /// Stop the current lap and return its length.
    ///
    /// Stopping a watch that is not running returns zero.
    pub fn stop(&mut self) -> Duration {
        match self.running_since.take() {
            Some(since) => {
                let lap = since.elapsed();
                self.accumulated += lap;
                lap
            }
            None => Duration::ZERO,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Total measured time, including the current lap if running.
    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }

    pub fn secs_since_start(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn reset(&mut self) {
        self.running_since = None;
        self.accumulated = Duration::ZERO;
    }
}

/// A scoped timer that reports its elapsed time at `debug` level.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    /// Stop the timer and return the elapsed time.
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and log the result.
    pub fn stop_and_log(self) -> Duration {
        let label = self.label;
        let elapsed = self.stop();
        tracing::debug!(timer = label, seconds = elapsed.as_secs_f64(), "timing");
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_watch_reports_zero() {
        let mut sw = StopWatch::new();
        assert_eq!(sw.elapsed(), Duration::ZERO);
        assert_eq!(sw.stop(), Duration::ZERO);
        assert!(!sw.is_running());
    }

    #[test]
    fn laps_accumulate() {
        let mut sw = StopWatch::started();
        std::thread::sleep(Duration::from_millis(2));
        let first = sw.stop();
        sw.start();
        std::thread::sleep(Duration::from_millis(2));
        let second = sw.stop();
        assert_eq!(sw.elapsed(), first + second);
        assert!(sw.elapsed() >= Duration::from_millis(4));
    }

    #[test]
    fn reset_clears_accumulated_time() {
        let mut sw = StopWatch::started();
        sw.stop();
        sw.reset();
        assert_eq!(sw.elapsed(), Duration::ZERO);
    }
}
