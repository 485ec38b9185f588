//! Mock stages and collaborators for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use crate::context::{RequestContext, ResponseContext, TEXT_CONTENT_TYPE};
use crate::core::{StageKind, StageOutput};
use crate::errors::{SitepipeError, StaticTransportError};
use crate::stages::Stage;
use crate::transport::{BasicRequestParser, RequestParser, StaticTransport};

/// Shared record of which stages ran, in order.
pub type StageLog = Arc<Mutex<Vec<String>>>;

/// A stage that records that it ran.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    kind: StageKind,
    log: StageLog,
}

impl RecordingStage {
    /// Creates a recording stage.
    #[must_use]
    pub fn new(name: impl Into<String>, log: &StageLog) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Custom,
            log: Arc::clone(log),
        }
    }

    /// Sets the stage kind.
    #[must_use]
    pub fn with_kind(mut self, kind: StageKind) -> Self {
        self.kind = kind;
        self
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn execute(
        &self,
        _req: &mut RequestContext,
        _res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        self.log.lock().push(self.name.clone());
        Ok(StageOutput::ok())
    }
}

/// A stage that always fails.
#[derive(Debug)]
pub struct FailingStage {
    name: String,
    error: String,
}

impl FailingStage {
    /// Creates a new failing stage.
    #[must_use]
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
        }
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        _req: &mut RequestContext,
        _res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        Err(SitepipeError::stage(&self.name, &self.error))
    }
}

/// A stage that writes a body and finishes the request.
#[derive(Debug)]
pub struct FinishingStage {
    name: String,
    body: String,
}

impl FinishingStage {
    /// Creates a finishing stage.
    #[must_use]
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

#[async_trait]
impl Stage for FinishingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        res.write(TEXT_CONTENT_TYPE, self.body.clone());
        req.finish();
        Ok(StageOutput::ok())
    }
}

/// A static transport whose every send fails.
#[derive(Debug, Default)]
pub struct FailingStaticTransport;

#[async_trait]
impl StaticTransport for FailingStaticTransport {
    async fn stream(
        &self,
        _req: &RequestContext,
        _res: &mut ResponseContext,
        path: &Path,
    ) -> Result<(), StaticTransportError> {
        Err(StaticTransportError::new(
            path,
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "client went away"),
        ))
    }
}

/// The default parser, except cleanup always fails.
#[derive(Debug, Default)]
pub struct FailingCleanupParser {
    inner: BasicRequestParser,
    cleanups: Mutex<usize>,
}

impl FailingCleanupParser {
    /// Returns how many times cleanup was attempted.
    #[must_use]
    pub fn cleanup_count(&self) -> usize {
        *self.cleanups.lock()
    }
}

#[async_trait]
impl RequestParser for FailingCleanupParser {
    async fn parse(&self, req: &mut RequestContext) -> Result<(), SitepipeError> {
        self.inner.parse(req).await
    }

    async fn cleanup(&self, _req: &mut RequestContext) -> Result<(), SitepipeError> {
        *self.cleanups.lock() += 1;
        Err(SitepipeError::stage("cleanup", "storage unavailable"))
    }
}
