//! Typed pipeline events.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineEventKind {
    /// A stage was entered.
    #[serde(rename = "stage.started")]
    StageStarted,
    /// A stage did its work.
    #[serde(rename = "stage.completed")]
    StageCompleted,
    /// A stage was skipped.
    #[serde(rename = "stage.skipped")]
    StageSkipped,
    /// A stage failed.
    #[serde(rename = "stage.failed")]
    StageFailed,
    /// Every stage has run for the request.
    #[serde(rename = "pipeline.completed")]
    PipelineCompleted,
}

impl fmt::Display for PipelineEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StageStarted => write!(f, "stage.started"),
            Self::StageCompleted => write!(f, "stage.completed"),
            Self::StageSkipped => write!(f, "stage.skipped"),
            Self::StageFailed => write!(f, "stage.failed"),
            Self::PipelineCompleted => write!(f, "pipeline.completed"),
        }
    }
}

/// One event emitted while running a request through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The event kind.
    pub kind: PipelineEventKind,
    /// The request the event belongs to.
    pub request_id: Uuid,
    /// The stage, for stage events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Duration in milliseconds, for terminal events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Skip reason or error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PipelineEvent {
    /// Creates an event for a stage.
    #[must_use]
    pub fn stage(kind: PipelineEventKind, request_id: Uuid, stage: impl Into<String>) -> Self {
        Self {
            kind,
            request_id,
            stage: Some(stage.into()),
            duration_ms: None,
            detail: None,
        }
    }

    /// Creates the pipeline completion event.
    #[must_use]
    pub fn completed(request_id: Uuid, duration_ms: f64) -> Self {
        Self {
            kind: PipelineEventKind::PipelineCompleted,
            request_id,
            stage: None,
            duration_ms: Some(duration_ms),
            detail: None,
        }
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
