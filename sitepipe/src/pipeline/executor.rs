//! Ordered stage execution for one request.

use super::{DefaultErrorHandler, ErrorHandler};
use crate::context::{RequestContext, ResponseContext};
use crate::core::{StageKind, StageStatus};
use crate::errors::SitepipeError;
use crate::events::{EventSink, LoggingEventSink, PipelineEvent, PipelineEventKind};
use crate::stages::Stage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn, Instrument};

/// What happened to one stage during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRecord {
    /// Stage name.
    pub name: String,
    /// Stage kind.
    pub kind: StageKind,
    /// Outcome.
    pub status: StageStatus,
    /// Time spent in the stage, zero when it was not executed.
    pub duration_ms: f64,
    /// Why the stage was skipped, if it was.
    pub skip_reason: Option<String>,
    /// False when the executor skipped the stage without calling it.
    pub executed: bool,
}

/// Result of running a pipeline over one request.
#[derive(Debug)]
pub struct PipelineReport {
    /// One record per configured stage, in order.
    pub records: Vec<StageRecord>,
    /// The failure handed to the error handler, if any.
    pub error: Option<SitepipeError>,
    /// Total execution time in milliseconds.
    pub duration_ms: f64,
}

impl PipelineReport {
    /// Returns true if no stage failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the record for the stage named `name`.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Returns the names of stages that actually executed.
    #[must_use]
    pub fn executed(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.executed)
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Runs an ordered list of stages against a request/response pair.
///
/// Stages run strictly in order. Once the request is finished or a stage has
/// failed, the remaining stages are skipped, except those whose kind always
/// runs (cleanup). The first failure goes to the error handler.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    error_handler: Arc<dyn ErrorHandler>,
    event_sink: Arc<dyn EventSink>,
}

impl Pipeline {
    /// Creates a pipeline with the plain error handler and a logging sink.
    #[must_use]
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages,
            error_handler: Arc::new(DefaultErrorHandler::new()),
            event_sink: Arc::new(LoggingEventSink::default()),
        }
    }

    /// Sets the error handler.
    #[must_use]
    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// Runs every stage over the request.
    pub async fn run(&self, req: &mut RequestContext, res: &mut ResponseContext) -> PipelineReport {
        let span = tracing::debug_span!("pipeline", request_id = %req.request_id());
        self.run_stages(req, res).instrument(span).await
    }

    async fn run_stages(&self, req: &mut RequestContext, res: &mut ResponseContext) -> PipelineReport {
        let start = Instant::now();
        let request_id = req.request_id();
        let mut records = Vec::with_capacity(self.stages.len());
        let mut failure: Option<SitepipeError> = None;

        for stage in &self.stages {
            let name = stage.name().to_string();
            let kind = stage.kind();

            if !kind.always_runs() && (failure.is_some() || req.is_finished()) {
                let reason = if failure.is_some() {
                    "pipeline already failed"
                } else {
                    "request already finished"
                };
                debug!(stage = %name, reason, "{}skipping stage", req.log_context());
                self.event_sink.emit(
                    &PipelineEvent::stage(PipelineEventKind::StageSkipped, request_id, &name)
                        .with_detail(reason),
                );
                records.push(StageRecord {
                    name,
                    kind,
                    status: StageStatus::Skip,
                    duration_ms: 0.0,
                    skip_reason: Some(reason.to_string()),
                    executed: false,
                });
                continue;
            }

            self.event_sink
                .emit(&PipelineEvent::stage(PipelineEventKind::StageStarted, request_id, &name));
            let stage_start = Instant::now();
            let result = stage.execute(req, res).await;
            let duration_ms = stage_start.elapsed().as_secs_f64() * 1000.0;

            match result {
                Ok(output) => {
                    let event_kind = if output.is_skipped() {
                        PipelineEventKind::StageSkipped
                    } else {
                        PipelineEventKind::StageCompleted
                    };
                    let mut event = PipelineEvent::stage(event_kind, request_id, &name)
                        .with_duration(duration_ms);
                    if let Some(reason) = &output.skip_reason {
                        event = event.with_detail(reason.clone());
                    }
                    self.event_sink.emit(&event);

                    records.push(StageRecord {
                        name,
                        kind,
                        status: output.status,
                        duration_ms,
                        skip_reason: output.skip_reason,
                        executed: true,
                    });
                }
                Err(err) => {
                    self.event_sink.emit(
                        &PipelineEvent::stage(PipelineEventKind::StageFailed, request_id, &name)
                            .with_duration(duration_ms)
                            .with_detail(err.to_string()),
                    );
                    records.push(StageRecord {
                        name: name.clone(),
                        kind,
                        status: StageStatus::Fail,
                        duration_ms,
                        skip_reason: None,
                        executed: true,
                    });

                    if failure.is_some() {
                        warn!(stage = %name, error = %err, "{}stage failed after an earlier failure", req.log_context());
                    } else if kind.always_runs() && res.is_written() {
                        // The response is complete; a late cleanup failure cannot replace it.
                        warn!(stage = %name, error = %err, "{}cleanup failed", req.log_context());
                    } else {
                        error!(
                            stage = %name,
                            kind = err.kind(),
                            error = %err,
                            "{}stage failed",
                            req.log_context()
                        );
                        self.error_handler.handle(&err, req, res).await;
                        failure = Some(err);
                    }
                }
            }
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.event_sink
            .emit(&PipelineEvent::completed(request_id, duration_ms));

        PipelineReport {
            records,
            error: failure,
            duration_ms,
        }
    }
}
