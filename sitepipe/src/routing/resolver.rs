//! Routing policy layered over a [`RouteMatcher`].

use super::RouteMatcher;
use crate::context::Resolution;
use crate::errors::ResolutionError;
use crate::pipeline::join_settled;
use std::sync::Arc;
use tracing::debug;

/// The route `/` is resolved as.
pub const INDEX_ROUTE: &str = "/default";

/// The outcome of routing one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteDecision {
    /// The targets that matched.
    pub resolution: Resolution,
    /// False for `.json` requests, which never render HTML.
    pub render_requested: bool,
}

/// Applies the index and `.json` policies to an external matcher.
#[derive(Clone)]
pub struct RouteResolver {
    matcher: Arc<dyn RouteMatcher>,
}

impl std::fmt::Debug for RouteResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteResolver").finish_non_exhaustive()
    }
}

impl RouteResolver {
    /// Creates a resolver over `matcher`.
    #[must_use]
    pub fn new(matcher: Arc<dyn RouteMatcher>) -> Self {
        Self { matcher }
    }

    /// Resolves a path exactly as given, with no policy applied.
    ///
    /// Used for the configured not-found and error routes.
    ///
    /// # Errors
    ///
    /// Returns the matcher's error.
    pub async fn resolve_exact(&self, path: &str) -> Result<Resolution, ResolutionError> {
        self.matcher.resolve(path).await
    }

    /// Resolves a request path.
    ///
    /// `/` becomes the index route. A path ending in `json` is resolved twice,
    /// concurrently: as given, to find a static file, and without its five
    /// character `.json` suffix, to find a controller or template. Rendering is
    /// turned off for such requests.
    ///
    /// # Errors
    ///
    /// Returns the first matcher error; both resolutions still run to completion.
    pub async fn resolve(&self, request_path: &str) -> Result<RouteDecision, ResolutionError> {
        let path = request_path.split('?').next().unwrap_or_default();
        let path = match path {
            "" | "/" => INDEX_ROUTE.to_string(),
            "/.json" => format!("{INDEX_ROUTE}.json"),
            other => other.to_string(),
        };

        if !path.ends_with("json") {
            return Ok(RouteDecision {
                resolution: self.matcher.resolve(&path).await?,
                render_requested: true,
            });
        }

        let stripped = strip_json_suffix(&path);
        debug!(path = %path, stripped = %stripped, "Path ends in json, resolving twice");

        let mut results = join_settled([self.matcher.resolve(&path), self.matcher.resolve(&stripped)])
            .await?
            .into_iter();
        let probe = results.next().unwrap_or_default();
        let target = results.next().unwrap_or_default();

        let static_only = Resolution {
            static_path: probe.static_path,
            ..Resolution::default()
        };

        Ok(RouteDecision {
            resolution: static_only.layered_over(target),
            render_requested: false,
        })
    }
}

/// Drops the trailing five bytes (`.json`); an empty result is the index.
///
/// A cut inside a multibyte character moves back to its start.
fn strip_json_suffix(path: &str) -> String {
    let mut cut = path.len().saturating_sub(5);
    while !path.is_char_boundary(cut) {
        cut -= 1;
    }
    let stripped = &path[..cut];
    if stripped.is_empty() || stripped == "/" {
        INDEX_ROUTE.to_string()
    } else {
        stripped.to_string()
    }
}
