//! Turns a failed request into a 500 response.

use crate::context::{RequestContext, ResponseContext, HTML_CONTENT_TYPE, TEXT_CONTENT_TYPE};
use crate::errors::SitepipeError;
use crate::services::SiteServices;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Body written when no error template is available.
pub const INTERNAL_ERROR_BODY: &str = "500 Internal Server Error";

/// Produces the response for a request whose pipeline failed.
///
/// Called once per request, for the first failure only. Cleanup still runs
/// after it returns.
#[async_trait]
pub trait ErrorHandler: Send + Sync + std::fmt::Debug {
    /// Writes an error response for `err`.
    async fn handle(&self, err: &SitepipeError, req: &mut RequestContext, res: &mut ResponseContext);
}

/// Renders the configured error route's template, or a fixed text body.
#[derive(Debug, Clone, Default)]
pub struct DefaultErrorHandler {
    services: Option<Arc<SiteServices>>,
}

impl DefaultErrorHandler {
    /// Creates a handler that always writes the fixed body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handler that tries the site's error template first.
    #[must_use]
    pub fn with_services(services: Arc<SiteServices>) -> Self {
        Self {
            services: Some(services),
        }
    }

    async fn render_error_page(&self, err: &SitepipeError, req: &RequestContext) -> Option<String> {
        let services = self.services.as_ref()?;
        let data = json!({
            "statusCode": err.status_code(),
            "error": err.kind(),
        });
        match services.render_route(&services.router.error_route, &data).await {
            Ok(page) => page,
            Err(render_err) => {
                warn!(error = %render_err, "{}error template failed, using plain body", req.log_context());
                None
            }
        }
    }
}

#[async_trait]
impl ErrorHandler for DefaultErrorHandler {
    async fn handle(&self, err: &SitepipeError, req: &mut RequestContext, res: &mut ResponseContext) {
        res.set_status(
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        );

        match self.render_error_page(err, req).await {
            Some(page) => res.write(HTML_CONTENT_TYPE, page),
            None => res.write(TEXT_CONTENT_TYPE, INTERNAL_ERROR_BODY),
        }
        req.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SiteFixture;

    fn failure() -> SitepipeError {
        SitepipeError::stage("run_controller", "boom")
    }

    #[tokio::test]
    async fn test_plain_body_without_services() {
        let mut req = RequestContext::get("/");
        let mut res = ResponseContext::new();

        DefaultErrorHandler::new().handle(&failure(), &mut req, &mut res).await;

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body_text(), INTERNAL_ERROR_BODY);
        assert!(req.is_finished());
    }

    #[tokio::test]
    async fn test_error_template_is_rendered() {
        let site = SiteFixture::new().template("500.tmpl", "<h1><%= statusCode %> <%= error %></h1>");
        let handler = DefaultErrorHandler::with_services(site.services());
        let mut req = RequestContext::get("/");
        let mut res = ResponseContext::new();

        handler.handle(&failure(), &mut req, &mut res).await;

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body_text(), "<h1>500 pipeline</h1>");
    }

    #[tokio::test]
    async fn test_broken_error_template_falls_back() {
        let site = SiteFixture::new().template("500.tmpl", "<%= nope.nope %>");
        let handler = DefaultErrorHandler::with_services(site.services());
        let mut req = RequestContext::get("/");
        let mut res = ResponseContext::new();

        handler.handle(&failure(), &mut req, &mut res).await;

        assert_eq!(res.body_text(), INTERNAL_ERROR_BODY);
    }
}
