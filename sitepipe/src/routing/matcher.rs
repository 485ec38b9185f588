//! The route matcher seam and its filesystem implementation.

use super::{normalize_route, ControllerRegistry};
use crate::config::RouterOptions;
use crate::context::Resolution;
use crate::errors::ResolutionError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maps a logical path to the controller, template and static targets that
/// exist for it.
///
/// The matching policy (extensions, precedence) belongs to the implementation;
/// callers only see the resulting [`Resolution`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteMatcher: Send + Sync {
    /// Resolves a logical path such as `/default` or `/foo.json`.
    async fn resolve(&self, path: &str) -> Result<Resolution, ResolutionError>;
}

/// Matches routes against a site directory and a controller registry.
///
/// - Controllers: a registered route key equal to the path.
/// - Templates: `<template_root>/<path>.<ext>` for each configured extension.
/// - Static files: `<static_root>/<path>`, excluding the template tree.
#[derive(Debug, Clone)]
pub struct FsRouteMatcher {
    template_root: PathBuf,
    static_root: PathBuf,
    template_exts: Vec<String>,
    controllers: Arc<ControllerRegistry>,
}

impl FsRouteMatcher {
    /// Creates a matcher for the site described by `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the site roots cannot be made absolute.
    pub fn new(
        options: &RouterOptions,
        controllers: Arc<ControllerRegistry>,
    ) -> Result<Self, std::io::Error> {
        Ok(Self {
            template_root: std::path::absolute(options.template_root())?,
            static_root: std::path::absolute(options.static_root())?,
            template_exts: options.template_exts.clone(),
            controllers,
        })
    }

    /// Returns the template root.
    #[must_use]
    pub fn template_root(&self) -> &Path {
        &self.template_root
    }

    async fn find_template(&self, route: &str, path: &str) -> Result<Option<PathBuf>, ResolutionError> {
        for ext in &self.template_exts {
            let candidate = self.template_root.join(format!("{route}.{ext}"));
            if is_file(&candidate, path).await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn find_static(&self, route: &str, path: &str) -> Result<Option<PathBuf>, ResolutionError> {
        let candidate = self.static_root.join(route);
        if candidate.starts_with(&self.template_root) {
            return Ok(None);
        }
        Ok(is_file(&candidate, path).await?.then_some(candidate))
    }
}

#[async_trait]
impl RouteMatcher for FsRouteMatcher {
    async fn resolve(&self, path: &str) -> Result<Resolution, ResolutionError> {
        let Some(route) = safe_route(path) else {
            return Ok(Resolution::default());
        };

        let mut resolution = Resolution::default();
        if self.controllers.contains(&route) {
            resolution.controller_path = Some(route.clone());
        }
        resolution.template_path = self.find_template(&route, path).await?;
        resolution.static_path = self.find_static(&route, path).await?;

        Ok(resolution)
    }
}

/// Returns the normalized route, or `None` if it is empty or escapes the site.
fn safe_route(path: &str) -> Option<String> {
    let route = normalize_route(path);
    if route.is_empty() {
        return None;
    }
    let escapes = route
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\'));
    (!escapes).then_some(route)
}

async fn is_file(candidate: &Path, path: &str) -> Result<bool, ResolutionError> {
    match tokio::fs::metadata(candidate).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => Err(ResolutionError::new(
            path,
            format!("cannot inspect {}: {err}", candidate.display()),
        )),
        Err(_) => Ok(false),
    }
}
