//! Subsystem coordinators notified at report-step boundaries.

/// Where a report step sits on the timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReportStepInfo {
    pub index: usize,
    /// Absolute start time (s)
    pub start: f64,
    /// Report step length (s)
    pub duration: f64,
}

/// A coupled subsystem (well network, aquifer, ...) with its own internal
/// state. The core only sequences the notifications.
pub trait Subsystem<S> {
    fn name(&self) -> &str;

    fn begin_report_step(&mut self, state: &mut S, step: &ReportStepInfo);

    fn end_report_step(&mut self, state: &mut S);
}

/// Ordered collection of subsystems; notifications go out in insertion order.
pub struct Subsystems<S> {
    members: Vec<Box<dyn Subsystem<S>>>,
}

impl<S> Default for Subsystems<S> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

impl<S> Subsystems<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, subsystem: impl Subsystem<S> + 'static) -> Self {
        self.push(subsystem);
        self
    }

    pub fn push(&mut self, subsystem: impl Subsystem<S> + 'static) {
        self.members.push(Box::new(subsystem));
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name()).collect()
    }

    pub fn begin_report_step(&mut self, state: &mut S, step: &ReportStepInfo) {
        for member in &mut self.members {
            tracing::trace!(subsystem = member.name(), step = step.index, "begin report step");
            member.begin_report_step(state, step);
        }
    }

    pub fn end_report_step(&mut self, state: &mut S) {
        for member in &mut self.members {
            tracing::trace!(subsystem = member.name(), "end report step");
            member.end_report_step(state);
        }
    }
}
