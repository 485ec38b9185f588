//! Releases per-request resources.

use crate::context::{RequestContext, ResponseContext};
use crate::core::{StageKind, StageOutput};
use crate::errors::SitepipeError;
use crate::services::SiteServices;
use super::Stage;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Asks the parser to release temporary storage. Runs for every request.
#[derive(Debug, Clone)]
pub struct CleanupStage {
    services: Arc<SiteServices>,
}

impl CleanupStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(services: Arc<SiteServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Stage for CleanupStage {
    fn name(&self) -> &str {
        "cleanup"
    }

    fn kind(&self) -> StageKind {
        StageKind::Cleanup
    }

    async fn execute(
        &self,
        req: &mut RequestContext,
        _res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        self.services
            .parser
            .cleanup(req)
            .await
            .inspect_err(|err| warn!(error = %err, "{}cleanup failed", req.log_context()))?;
        Ok(StageOutput::ok())
    }
}
