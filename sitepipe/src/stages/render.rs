//! Renders the matched template into the response.

use crate::context::{RequestContext, ResponseContext};
use crate::core::{StageKind, StageOutput};
use crate::errors::SitepipeError;
use crate::services::SiteServices;
use super::Stage;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

/// Compiles the resolved template and stores the rendered text.
///
/// Nothing is written here; the emit stage sends the text.
#[derive(Debug, Clone)]
pub struct RenderStage {
    services: Arc<SiteServices>,
}

impl RenderStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(services: Arc<SiteServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Stage for RenderStage {
    fn name(&self) -> &str {
        "render"
    }

    fn kind(&self) -> StageKind {
        StageKind::Render
    }

    async fn execute(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        if req.is_finished() {
            return Ok(StageOutput::skip("request already finished"));
        }
        if !req.render_requested() {
            return Ok(StageOutput::skip("render not requested"));
        }
        let Some(template) = req.resolution().template_path.clone() else {
            return Ok(StageOutput::skip("no template matched"));
        };

        let data = res.payload_value()?;
        let compiler = &self.services.compiler;
        let compiled = compiler.compile(&template).await.inspect_err(|err| {
            if !err.chain.is_empty() {
                error!(chain = %err.chain_display(), "{}{err}", req.log_context());
            }
        })?;
        let text = compiler.render(&compiled, &data)?;

        debug!(template = %template.display(), bytes = text.len(), "{}rendered", req.log_context());
        res.set_rendered_text(text);
        Ok(StageOutput::ok())
    }
}
