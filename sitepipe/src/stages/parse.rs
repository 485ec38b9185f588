//! Parses the request URL and body.

use crate::context::{RequestContext, ResponseContext};
use crate::core::{StageKind, StageOutput};
use crate::errors::SitepipeError;
use crate::services::SiteServices;
use super::Stage;
use async_trait::async_trait;
use std::sync::Arc;

/// Hands the request to the configured parser.
#[derive(Debug, Clone)]
pub struct ParseStage {
    services: Arc<SiteServices>,
}

impl ParseStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(services: Arc<SiteServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Stage for ParseStage {
    fn name(&self) -> &str {
        "parse"
    }

    fn kind(&self) -> StageKind {
        StageKind::Parse
    }

    async fn execute(
        &self,
        req: &mut RequestContext,
        _res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        self.services.parser.parse(req).await?;
        Ok(StageOutput::ok())
    }
}
