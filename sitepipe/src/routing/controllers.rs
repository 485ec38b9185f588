//! Controllers: user code that fills in the response payload.

use crate::context::{RequestContext, ResponseContext};
use crate::errors::SitepipeError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// User code invoked when a route resolves to a controller.
///
/// A controller is expected to populate the response payload and may finish
/// the request itself.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Runs the controller.
    async fn run(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Result<(), SitepipeError>;
}

/// A controller backed by a plain function.
pub struct FnController<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext) -> Result<(), SitepipeError> + Send + Sync,
{
    func: F,
}

impl<F> FnController<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext) -> Result<(), SitepipeError> + Send + Sync,
{
    /// Creates a new function-based controller.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Controller for FnController<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext) -> Result<(), SitepipeError> + Send + Sync,
{
    async fn run(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Result<(), SitepipeError> {
        (self.func)(req, res)
    }
}

/// Normalizes a route key: no leading or trailing slashes.
#[must_use]
pub fn normalize_route(route: &str) -> String {
    route.trim_matches('/').to_string()
}

/// Controllers addressable by route key (`"default"`, `"admin/users"`).
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: DashMap<String, Arc<dyn Controller>>,
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("routes", &self.routes())
            .finish()
    }
}

impl ControllerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller, replacing any previous one for the route.
    pub fn register(&self, route: &str, controller: Arc<dyn Controller>) {
        self.controllers.insert(normalize_route(route), controller);
    }

    /// Registers a function as a controller.
    pub fn register_fn<F>(&self, route: &str, func: F)
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> Result<(), SitepipeError>
            + Send
            + Sync
            + 'static,
    {
        self.register(route, Arc::new(FnController::new(func)));
    }

    /// Looks up a controller.
    #[must_use]
    pub fn get(&self, route: &str) -> Option<Arc<dyn Controller>> {
        self.controllers
            .get(&normalize_route(route))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns true if a controller is registered for the route.
    #[must_use]
    pub fn contains(&self, route: &str) -> bool {
        self.controllers.contains_key(&normalize_route(route))
    }

    /// Returns the registered route keys, sorted.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = self.controllers.iter().map(|e| e.key().clone()).collect();
        routes.sort();
        routes
    }

    /// Returns the number of registered controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Returns true if no controllers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}
