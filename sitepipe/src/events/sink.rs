//! Event sink trait and implementations.

use super::{PipelineEvent, PipelineEventKind};
use parking_lot::RwLock;
use tracing::{debug, warn, Level};

/// Receives pipeline events.
///
/// Emitting must never fail or block the request; sinks swallow their own
/// errors.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Emits an event.
    fn emit(&self, event: &PipelineEvent);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &PipelineEvent) {}
}

/// An event sink that logs events using the tracing framework.
///
/// Failures are always logged at `WARN`; everything else at the configured level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        let stage = event.stage.as_deref().unwrap_or("-");
        let detail = event.detail.as_deref().unwrap_or("");

        if event.kind == PipelineEventKind::StageFailed {
            warn!(
                event_type = %event.kind,
                request_id = %event.request_id,
                stage,
                detail,
                "Event: {}", event.kind
            );
            return;
        }

        if self.level <= Level::INFO {
            tracing::info!(
                event_type = %event.kind,
                request_id = %event.request_id,
                stage,
                duration_ms = ?event.duration_ms,
                detail,
                "Event: {}", event.kind
            );
        } else {
            debug!(
                event_type = %event.kind,
                request_id = %event.request_id,
                stage,
                duration_ms = ?event.duration_ms,
                detail,
                "Event: {}", event.kind
            );
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns collected events of one kind.
    #[must_use]
    pub fn events_of_kind(&self, kind: PipelineEventKind) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns the stages that emitted `kind`, in order.
    #[must_use]
    pub fn stages_with(&self, kind: PipelineEventKind) -> Vec<String> {
        self.events_of_kind(kind)
            .into_iter()
            .filter_map(|e| e.stage)
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }
}
