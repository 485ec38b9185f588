//! Resolves the parsed URL to controller, template and static targets.

use crate::context::{RequestContext, ResponseContext};
use crate::core::{StageKind, StageOutput};
use crate::errors::SitepipeError;
use crate::services::SiteServices;
use super::Stage;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Populates the request's resolution.
#[derive(Debug, Clone)]
pub struct RouteStage {
    services: Arc<SiteServices>,
}

impl RouteStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(services: Arc<SiteServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Stage for RouteStage {
    fn name(&self) -> &str {
        "route"
    }

    fn kind(&self) -> StageKind {
        StageKind::Route
    }

    async fn execute(
        &self,
        req: &mut RequestContext,
        _res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        let Some(url) = req.url_parsed() else {
            return Err(SitepipeError::stage(self.name(), "parsed URL is not set"));
        };
        let pathname = url.pathname.clone();

        let decision = self.services.resolver.resolve(&pathname).await?;
        if !decision.render_requested {
            req.set_render_requested(false);
        }

        debug!(
            controller = ?decision.resolution.controller_path,
            template = ?decision.resolution.template_path,
            static_file = ?decision.resolution.static_path,
            "{}routed {pathname}",
            req.log_context()
        );
        req.set_resolution(decision.resolution);
        Ok(StageOutput::ok())
    }
}
