//! Pipeline lifecycle events for observability.
//!
//! Every pipeline owns one sink, injected at construction; there is no
//! process-wide sink.

mod event;
mod sink;

pub use event::{PipelineEvent, PipelineEventKind};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
