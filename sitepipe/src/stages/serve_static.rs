//! Sends a matched static file.

use crate::context::{RequestContext, ResponseContext};
use crate::core::{StageKind, StageOutput};
use crate::errors::SitepipeError;
use crate::services::SiteServices;
use super::Stage;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Finishes the request by streaming the resolved static file.
#[derive(Debug, Clone)]
pub struct ServeStaticStage {
    services: Arc<SiteServices>,
}

impl ServeStaticStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(services: Arc<SiteServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Stage for ServeStaticStage {
    fn name(&self) -> &str {
        "serve_static"
    }

    fn kind(&self) -> StageKind {
        StageKind::ServeStatic
    }

    async fn execute(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        let Some(path) = req.resolution().static_path.clone() else {
            return Ok(StageOutput::skip("no static file matched"));
        };

        // Transport errors still fail the stage after this point.
        req.finish();
        self.services
            .static_transport
            .stream(req, res, &path)
            .await
            .inspect_err(|err| warn!(error = %err, "{}static transport failed", req.log_context()))?;

        Ok(StageOutput::ok())
    }
}
