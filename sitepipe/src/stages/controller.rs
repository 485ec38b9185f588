//! Runs a matched controller, or the not-found procedure.

use crate::context::{RequestContext, ResponseContext, TEXT_CONTENT_TYPE};
use crate::core::{StageKind, StageOutput};
use crate::errors::SitepipeError;
use crate::services::SiteServices;
use super::Stage;
use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{debug, info};

/// Body written when nothing matched and no not-found template exists.
pub const NOT_FOUND_BODY: &str = "404 Not Found";

/// Invokes user code for the matched route.
///
/// Exactly one of three things happens:
/// - a controller matched: it runs with the shared contexts
/// - only a template matched: nothing, rendering takes over
/// - nothing matched: the response becomes a 404
#[derive(Debug, Clone)]
pub struct RunControllerStage {
    services: Arc<SiteServices>,
}

impl RunControllerStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(services: Arc<SiteServices>) -> Self {
        Self { services }
    }

    async fn target_not_found(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Result<(), SitepipeError> {
        info!("{}target not found", req.log_context());
        res.set_status(StatusCode::NOT_FOUND);

        if req.render_requested() {
            let route = &self.services.router.not_found_route;
            let fallback = self.services.resolver.resolve_exact(route).await?;
            if let Some(template) = fallback.template_path {
                debug!(template = %template.display(), "Rendering not-found template");
                req.resolution_mut().template_path = Some(template);
                return Ok(());
            }
        }

        res.write(TEXT_CONTENT_TYPE, NOT_FOUND_BODY);
        req.finish();
        Ok(())
    }
}

#[async_trait]
impl Stage for RunControllerStage {
    fn name(&self) -> &str {
        "run_controller"
    }

    fn kind(&self) -> StageKind {
        StageKind::RunController
    }

    async fn execute(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        let resolution = req.resolution().clone();

        if let Some(route) = resolution.controller_path {
            let controller = self.services.controllers.get(&route).ok_or_else(|| {
                SitepipeError::stage(self.name(), format!("no controller registered for '{route}'"))
            })?;
            debug!(route = %route, "{}running controller", req.log_context());
            controller.run(req, res).await?;
            return Ok(StageOutput::ok());
        }

        if resolution.template_path.is_some() {
            return Ok(StageOutput::skip("template only"));
        }

        if resolution.static_path.is_some() {
            return Ok(StageOutput::skip("static file only"));
        }

        self.target_not_found(req, res).await?;
        Ok(StageOutput::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Resolution;
    use crate::routing::ControllerRegistry;
    use crate::testing::SiteFixture;
    use serde_json::json;

    #[tokio::test]
    async fn test_no_match_writes_plain_404() {
        let site = SiteFixture::new();
        let stage = RunControllerStage::new(site.services());

        let mut req = RequestContext::get("/missing");
        let mut res = ResponseContext::new();
        stage.execute(&mut req, &mut res).await.unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.body_text(), NOT_FOUND_BODY);
        assert!(req.is_finished());
    }

    #[tokio::test]
    async fn test_no_match_uses_not_found_template() {
        let site = SiteFixture::new().template("404.tmpl", "<h1>Lost</h1>");
        let stage = RunControllerStage::new(site.services());

        let mut req = RequestContext::get("/missing");
        let mut res = ResponseContext::new();
        stage.execute(&mut req, &mut res).await.unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(!res.is_written());
        assert!(!req.is_finished());
        assert!(req.resolution().template_path.as_ref().unwrap().ends_with("404.tmpl"));
    }

    #[tokio::test]
    async fn test_json_request_skips_not_found_template() {
        let site = SiteFixture::new().template("404.tmpl", "<h1>Lost</h1>");
        let stage = RunControllerStage::new(site.services());

        let mut req = RequestContext::get("/missing.json");
        req.set_render_requested(false);
        let mut res = ResponseContext::new();
        stage.execute(&mut req, &mut res).await.unwrap();

        assert_eq!(res.body_text(), NOT_FOUND_BODY);
        assert!(req.is_finished());
    }

    #[tokio::test]
    async fn test_template_only_is_skipped() {
        let site = SiteFixture::new();
        let stage = RunControllerStage::new(site.services());

        let mut req = RequestContext::get("/page");
        req.set_resolution(Resolution::new().with_template("/t/page.tmpl"));
        let output = stage.execute(&mut req, &mut ResponseContext::new()).await.unwrap();

        assert!(output.is_skipped());
    }

    #[tokio::test]
    async fn test_controller_runs_with_shared_contexts() {
        let controllers = ControllerRegistry::new();
        controllers.register_fn("default", |_req, res| {
            res.set_payload(json!({"foo": "bar"}));
            Ok(())
        });
        let site = SiteFixture::new();
        let stage = RunControllerStage::new(site.services_with(controllers));

        let mut req = RequestContext::get("/");
        req.set_resolution(Resolution::new().with_controller("default"));
        let mut res = ResponseContext::new();
        stage.execute(&mut req, &mut res).await.unwrap();

        assert_eq!(res.payload_value().unwrap(), json!({"foo": "bar"}));
    }

    #[tokio::test]
    async fn test_unregistered_controller_fails() {
        let site = SiteFixture::new();
        let stage = RunControllerStage::new(site.services());

        let mut req = RequestContext::get("/");
        req.set_resolution(Resolution::new().with_controller("ghost"));
        let result = stage.execute(&mut req, &mut ResponseContext::new()).await;

        assert!(result.is_err());
    }
}
