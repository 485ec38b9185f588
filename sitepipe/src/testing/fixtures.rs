//! On-disk site fixtures.

use crate::config::{AppOptions, RouterOptions};
use crate::context::RequestContext;
use crate::routing::ControllerRegistry;
use crate::services::SiteServices;
use crate::transport::{BasicRequestParser, RequestParser};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A throwaway site directory with `public/` and `public/templates/`.
#[derive(Debug)]
pub struct SiteFixture {
    dir: tempfile::TempDir,
}

impl Default for SiteFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteFixture {
    /// Creates an empty site.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("public/templates")).unwrap();
        Self { dir }
    }

    /// Adds a template under `public/templates`.
    #[must_use]
    pub fn template(self, name: &str, content: &str) -> Self {
        self.write(&Path::new("public/templates").join(name), content)
    }

    /// Adds a static file under `public`.
    #[must_use]
    pub fn static_file(self, name: &str, content: &str) -> Self {
        self.write(&Path::new("public").join(name), content)
    }

    fn write(self, relative: &Path, content: &str) -> Self {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        self
    }

    /// Returns the site root.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the absolute path of a template.
    #[must_use]
    pub fn template_path(&self, name: &str) -> PathBuf {
        std::path::absolute(self.router_options().template_root())
            .unwrap()
            .join(name)
    }

    /// Returns router options rooted at the site.
    #[must_use]
    pub fn router_options(&self) -> RouterOptions {
        RouterOptions::new(self.dir.path())
    }

    /// Returns app options rooted at the site.
    #[must_use]
    pub fn app_options(&self) -> AppOptions {
        AppOptions::new().with_router(self.router_options())
    }

    /// Builds services with no controllers.
    #[must_use]
    pub fn services(&self) -> Arc<SiteServices> {
        self.services_with(ControllerRegistry::new())
    }

    /// Builds services with `controllers`.
    #[must_use]
    pub fn services_with(&self, controllers: ControllerRegistry) -> Arc<SiteServices> {
        Arc::new(
            SiteServices::new(self.router_options(), Default::default(), controllers).unwrap(),
        )
    }

    /// Returns a GET request that has been through the default parser.
    pub async fn parsed_request(&self, uri: &str) -> RequestContext {
        let mut req = RequestContext::get(uri);
        BasicRequestParser::default().parse(&mut req).await.unwrap();
        req
    }
}
