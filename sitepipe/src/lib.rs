//! # Sitepipe
//!
//! A request-processing pipeline for server-rendered sites.
//!
//! Every HTTP request flows through an ordered list of stages sharing one
//! request context and one response context:
//!
//! - **Parse**: read the URL, query and body
//! - **Route**: resolve the path to a controller, a template or a static file
//! - **ServeStatic**: stream a matched static file and finish the request
//! - **RunController**: produce the payload, or answer 404
//! - **Render**: compile the template (with includes) and render the payload
//! - **Emit**: write the rendered HTML or the JSON payload
//! - **Cleanup**: release per-request resources, always
//!
//! Templates are compiled by [`template::TemplateCompiler`], which inlines
//! `include` directives recursively, detects include cycles, substitutes
//! include arguments and caches the result per file.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sitepipe::prelude::*;
//! use serde_json::json;
//!
//! let controllers = ControllerRegistry::new();
//! controllers.register_fn("/default", |_req, res| {
//!     res.set_payload(json!({"title": "Home"}));
//!     Ok(())
//! });
//!
//! let options = AppOptions::new()
//!     .with_router(RouterOptions::new("./site"))
//!     .with_controllers(controllers);
//!
//! let mut app = App::new(options)?;
//! let addr = app.start().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod app;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod services;
pub mod stages;
pub mod template;
pub mod transport;

#[cfg(test)]
mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::app::App;
    pub use crate::config::{AppOptions, ListenOptions, RequestParserOptions, RouterOptions, SiteConfig};
    pub use crate::context::{ParsedBody, ParsedUrl, Payload, RequestContext, Resolution, ResponseContext};
    pub use crate::core::{StageKind, StageOutput, StageStatus};
    pub use crate::errors::{SitepipeError, TemplateError, TemplateErrorKind};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{ErrorHandler, Pipeline, PipelineReport};
    pub use crate::routing::{Controller, ControllerRegistry, RouteMatcher, RouteResolver};
    pub use crate::services::SiteServices;
    pub use crate::stages::{default_stages, FnStage, Stage};
    pub use crate::template::TemplateCompiler;
    pub use crate::transport::{RequestParser, StaticTransport};
}
