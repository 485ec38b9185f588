//! The collaborators shared by the default stages.

use crate::config::{RequestParserOptions, RouterOptions};
use crate::errors::SitepipeError;
use crate::routing::{ControllerRegistry, FsRouteMatcher, RouteMatcher, RouteResolver};
use crate::template::TemplateCompiler;
use crate::transport::{BasicRequestParser, FsStaticTransport, RequestParser, StaticTransport};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Everything a stage needs besides the request and response.
///
/// Built once per application and handed to each stage explicitly.
#[derive(Debug, Clone)]
pub struct SiteServices {
    /// Router options, including the not-found and error routes.
    pub router: RouterOptions,
    /// Route resolution policy over the matcher.
    pub resolver: RouteResolver,
    /// Template compiler with its cache.
    pub compiler: TemplateCompiler,
    /// Registered controllers.
    pub controllers: Arc<ControllerRegistry>,
    /// Request parser.
    pub parser: Arc<dyn RequestParser>,
    /// Static file transport.
    pub static_transport: Arc<dyn StaticTransport>,
}

impl SiteServices {
    /// Creates services with the filesystem matcher, the built-in parser and
    /// the filesystem static transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the site roots cannot be made absolute.
    pub fn new(
        router: RouterOptions,
        parser_options: RequestParserOptions,
        controllers: ControllerRegistry,
    ) -> Result<Self, SitepipeError> {
        let controllers = Arc::new(controllers);
        let matcher = FsRouteMatcher::new(&router, Arc::clone(&controllers))?;

        Ok(Self {
            resolver: RouteResolver::new(Arc::new(matcher)),
            compiler: TemplateCompiler::from_options(&router),
            controllers,
            parser: Arc::new(BasicRequestParser::new(parser_options)),
            static_transport: Arc::new(FsStaticTransport),
            router,
        })
    }

    /// Replaces the route matcher.
    #[must_use]
    pub fn with_route_matcher(mut self, matcher: Arc<dyn RouteMatcher>) -> Self {
        self.resolver = RouteResolver::new(matcher);
        self
    }

    /// Replaces the request parser.
    #[must_use]
    pub fn with_request_parser(mut self, parser: Arc<dyn RequestParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Replaces the static transport.
    #[must_use]
    pub fn with_static_transport(mut self, transport: Arc<dyn StaticTransport>) -> Self {
        self.static_transport = transport;
        self
    }

    /// Renders the template configured for `route`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns resolution and template errors.
    pub async fn render_route(&self, route: &str, data: &Value) -> Result<Option<String>, SitepipeError> {
        let resolution = self.resolver.resolve_exact(route).await?;
        let Some(template) = resolution.template_path else {
            debug!(route, "No template configured for route");
            return Ok(None);
        };
        let text = self.compiler.compile_and_render(&template, data).await?;
        Ok(Some(text))
    }
}
