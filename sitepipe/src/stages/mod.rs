//! Stage trait and implementations.
//!
//! Stages are the units of work in a request pipeline. Each one receives the
//! request and response of a single request, in configured order.

mod cleanup;
mod controller;
mod emit;
mod parse;
mod render;
mod route;
mod serve_static;

pub use cleanup::CleanupStage;
pub use controller::RunControllerStage;
pub use emit::EmitStage;
pub use parse::ParseStage;
pub use render::RenderStage;
pub use route::RouteStage;
pub use serve_static::ServeStaticStage;

use crate::context::{RequestContext, ResponseContext};
use crate::core::{StageKind, StageOutput};
use crate::errors::SitepipeError;
use crate::services::SiteServices;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Trait for pipeline stages.
///
/// The executor decides whether a stage runs at all: once the request is
/// finished or a stage has failed, only stages whose kind always runs are
/// executed.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Returns the role of the stage.
    fn kind(&self) -> StageKind {
        StageKind::Custom
    }

    /// Executes the stage.
    ///
    /// # Arguments
    ///
    /// * `req` - The request context
    /// * `res` - The response context
    ///
    /// # Returns
    ///
    /// The stage output, or the error that ends the request.
    async fn execute(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError>;
}

/// Returns the seven default stages, in order.
#[must_use]
pub fn default_stages(services: &Arc<SiteServices>) -> Vec<Arc<dyn Stage>> {
    vec![
        Arc::new(ParseStage::new(Arc::clone(services))),
        Arc::new(RouteStage::new(Arc::clone(services))),
        Arc::new(ServeStaticStage::new(Arc::clone(services))),
        Arc::new(RunControllerStage::new(Arc::clone(services))),
        Arc::new(RenderStage::new(Arc::clone(services))),
        Arc::new(EmitStage::new()),
        Arc::new(CleanupStage::new(Arc::clone(services))),
    ]
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext) -> Result<StageOutput, SitepipeError>
        + Send
        + Sync,
{
    name: String,
    kind: StageKind,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext) -> Result<StageOutput, SitepipeError>
        + Send
        + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Custom,
            func,
        }
    }

    /// Sets the stage kind.
    #[must_use]
    pub fn with_kind(mut self, kind: StageKind) -> Self {
        self.kind = kind;
        self
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext) -> Result<StageOutput, SitepipeError>
        + Send
        + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext) -> Result<StageOutput, SitepipeError>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn execute(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        (self.func)(req, res)
    }
}
