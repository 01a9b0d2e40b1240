//! Snapshot output contract.

use crate::error::SimResult;

/// Metadata accompanying a state snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapshotInfo {
    /// Report steps completed when the snapshot was taken
    pub report_step: usize,
    /// Simulated time since the start of the timeline (s)
    pub elapsed: f64,
    /// Always false: only report-step boundaries are written
    pub is_substep: bool,
    /// Wall time since the run started (s)
    pub wall_time_s: f64,
    /// Step size to resume with, when adaptive stepping is active
    pub next_suggested_step: Option<f64>,
}

impl SnapshotInfo {
    /// Persisted form of `next_suggested_step`: `-1` when absent.
    pub fn suggested_step_or_sentinel(&self) -> f64 {
        self.next_suggested_step
            .unwrap_or(crate::restart::RestartHint::SENTINEL)
    }
}

/// Receives report-step snapshots. Implementations own persistence,
/// including storing `next_suggested_step` for later restarts.
pub trait OutputSink<S> {
    fn write_snapshot(&mut self, state: &S, info: &SnapshotInfo) -> SimResult<()>;
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl<S> OutputSink<S> for NullSink {
    fn write_snapshot(&mut self, _state: &S, _info: &SnapshotInfo) -> SimResult<()> {
        Ok(())
    }
}

/// Sink that keeps every snapshot in memory.
#[derive(Debug, Clone)]
pub struct MemorySink<S> {
    pub snapshots: Vec<(S, SnapshotInfo)>,
}

impl<S> Default for MemorySink<S> {
    fn default() -> Self {
        Self {
            snapshots: Vec::new(),
        }
    }
}

impl<S: Clone> OutputSink<S> for MemorySink<S> {
    fn write_snapshot(&mut self, state: &S, info: &SnapshotInfo) -> SimResult<()> {
        self.snapshots.push((state.clone(), *info));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_for_missing_suggestion() {
        let mut info = SnapshotInfo {
            report_step: 0,
            elapsed: 0.0,
            is_substep: false,
            wall_time_s: 0.0,
            next_suggested_step: None,
        };
        assert_eq!(info.suggested_step_or_sentinel(), -1.0);
        info.next_suggested_step = Some(3600.0);
        assert_eq!(info.suggested_step_or_sentinel(), 3600.0);
    }

    #[test]
    fn memory_sink_records_in_order() {
        let mut sink = MemorySink::default();
        for step in 0..3 {
            let info = SnapshotInfo {
                report_step: step,
                elapsed: step as f64,
                is_substep: false,
                wall_time_s: 0.0,
                next_suggested_step: None,
            };
            sink.write_snapshot(&(step * 10), &info).unwrap();
        }
        let states: Vec<usize> = sink.snapshots.iter().map(|(s, _)| *s).collect();
        assert_eq!(states, vec![0, 10, 20]);
    }
}
