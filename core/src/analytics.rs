//! Analytics sink
//!
//! Optional capability injected into simulations. Nothing requires it; the
//! default sink drops every event.

use crate::engine::RunId;
use std::sync::Arc;

/// Events reported by simulations
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent {
    RunStarted { sim: String, run: RunId },
    Transition { sim: String, run: RunId, phase: String },
    RunCompleted { sim: String, run: RunId },
    RunCancelled { sim: String, run: RunId },
    ScenarioPicked { sim: String, scenario: String },
    Decision { sim: String, approved: bool },
}

impl AnalyticsEvent {
    /// Short event name, in the style of page-view analytics
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::RunStarted { .. } => "run_started",
            AnalyticsEvent::Transition { .. } => "transition",
            AnalyticsEvent::RunCompleted { .. } => "run_completed",
            AnalyticsEvent::RunCancelled { .. } => "run_cancelled",
            AnalyticsEvent::ScenarioPicked { .. } => "scenario_picked",
            AnalyticsEvent::Decision { .. } => "decision",
        }
    }
}

pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &AnalyticsEvent);
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn track(&self, _event: &AnalyticsEvent) {}
}

/// Forwards events to the debug logger
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AnalyticsSink for LogSink {
    fn track(&self, event: &AnalyticsEvent) {
        crate::info_log!("analytics {}: {:?}", event.name(), event);
    }
}

pub type SharedSink = Arc<dyn AnalyticsSink>;

pub fn noop() -> SharedSink {
    Arc::new(NoopSink)
}

/// Records events in memory; used by tests across the crate
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: parking_lot::Mutex<Vec<AnalyticsEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }
}

#[cfg(test)]
impl AnalyticsSink for RecordingSink {
    fn track(&self, event: &AnalyticsEvent) {
        self.events.lock().push(event.clone());
    }
}
