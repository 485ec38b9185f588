//! Configuration types for a site.
//!
//! `SiteConfig` is the serializable part (loadable from TOML); `AppOptions`
//! adds the runtime pieces that cannot be written down in a file, such as
//! controllers, custom stage lists and collaborator overrides.

use crate::events::EventSink;
use crate::pipeline::ErrorHandler;
use crate::routing::{ControllerRegistry, RouteMatcher};
use crate::stages::Stage;
use crate::transport::{RequestParser, StaticTransport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for route matching and template lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterOptions {
    /// Root directory of the site.
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    /// Template directory, relative to `base_path`.
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,
    /// Static file directory, relative to `base_path`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Template file extensions, tried in order.
    #[serde(default = "default_template_exts")]
    pub template_exts: Vec<String>,
    /// Route consulted when no target matches.
    #[serde(default = "default_not_found_route")]
    pub not_found_route: String,
    /// Route consulted by the error handler.
    #[serde(default = "default_error_route")]
    pub error_route: String,
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("public/templates")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_template_exts() -> Vec<String> {
    vec!["tmpl".to_string(), "ejs".to_string(), "html".to_string()]
}

fn default_not_found_route() -> String {
    "/404".to_string()
}

fn default_error_route() -> String {
    "/500".to_string()
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            template_dir: default_template_dir(),
            static_dir: default_static_dir(),
            template_exts: default_template_exts(),
            not_found_route: default_not_found_route(),
            error_route: default_error_route(),
        }
    }
}

impl RouterOptions {
    /// Creates router options rooted at `base_path`.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    /// Sets the template extensions.
    #[must_use]
    pub fn with_template_exts(mut self, exts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.template_exts = exts.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the absolute-ish template root.
    #[must_use]
    pub fn template_root(&self) -> PathBuf {
        self.base_path.join(&self.template_dir)
    }

    /// Returns the static file root.
    #[must_use]
    pub fn static_root(&self) -> PathBuf {
        self.base_path.join(&self.static_dir)
    }
}

/// Options for request parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParserOptions {
    /// Directory for large request bodies. Bodies stay in memory when unset.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    /// Bodies larger than this are written to `storage_dir`.
    #[serde(default = "default_spill_threshold")]
    pub spill_threshold_bytes: usize,
    /// Largest accepted request body.
    #[serde(default = "default_max_body")]
    pub max_body_bytes: usize,
}

fn default_spill_threshold() -> usize {
    1024 * 1024 // 1MB
}

fn default_max_body() -> usize {
    10 * 1024 * 1024 // 10MB
}

impl Default for RequestParserOptions {
    fn default() -> Self {
        Self {
            storage_dir: None,
            spill_threshold_bytes: default_spill_threshold(),
            max_body_bytes: default_max_body(),
        }
    }
}

/// Where the HTTP listener binds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenOptions {
    /// Host or IP address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port; 0 picks an ephemeral port.
    #[serde(default)]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
        }
    }
}

impl ListenOptions {
    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The file-backed part of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Router options.
    #[serde(default)]
    pub router: RouterOptions,
    /// Request parser options.
    #[serde(default)]
    pub request_parser: RequestParserOptions,
    /// Listener options.
    #[serde(default)]
    pub listen: ListenOptions,
}

impl SiteConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the document is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Loads a TOML file. Relative paths inside the file stay relative to the
    /// working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&text)?)
    }
}

/// Constructor options for an [`App`](crate::app::App).
#[derive(Default)]
pub struct AppOptions {
    /// Router options.
    pub router: RouterOptions,
    /// Request parser options.
    pub request_parser: RequestParserOptions,
    /// Listener options.
    pub listen: ListenOptions,
    /// Replaces the default seven-stage pipeline entirely.
    pub stages: Option<Vec<Arc<dyn Stage>>>,
    /// Controllers addressable by route key.
    pub controllers: ControllerRegistry,
    /// Replaces the filesystem route matcher.
    pub route_matcher: Option<Arc<dyn RouteMatcher>>,
    /// Replaces the built-in request parser.
    pub request_parser_impl: Option<Arc<dyn RequestParser>>,
    /// Replaces the filesystem static transport.
    pub static_transport: Option<Arc<dyn StaticTransport>>,
    /// Replaces the default error handler.
    pub error_handler: Option<Arc<dyn ErrorHandler>>,
    /// Receives pipeline events. Defaults to a logging sink.
    pub event_sink: Option<Arc<dyn EventSink>>,
}

impl fmt::Debug for AppOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppOptions")
            .field("router", &self.router)
            .field("request_parser", &self.request_parser)
            .field("listen", &self.listen)
            .field("stages", &self.stages.as_ref().map(Vec::len))
            .field("controllers", &self.controllers.len())
            .finish_non_exhaustive()
    }
}

impl AppOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options from a file-backed configuration.
    #[must_use]
    pub fn from_config(config: SiteConfig) -> Self {
        Self {
            router: config.router,
            request_parser: config.request_parser,
            listen: config.listen,
            ..Self::default()
        }
    }

    /// Sets the router options.
    #[must_use]
    pub fn with_router(mut self, router: RouterOptions) -> Self {
        self.router = router;
        self
    }

    /// Sets the request parser options.
    #[must_use]
    pub fn with_request_parser(mut self, options: RequestParserOptions) -> Self {
        self.request_parser = options;
        self
    }

    /// Replaces the stage list.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<Arc<dyn Stage>>) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Sets the controllers.
    #[must_use]
    pub fn with_controllers(mut self, controllers: ControllerRegistry) -> Self {
        self.controllers = controllers;
        self
    }

    /// Replaces the route matcher.
    #[must_use]
    pub fn with_route_matcher(mut self, matcher: Arc<dyn RouteMatcher>) -> Self {
        self.route_matcher = Some(matcher);
        self
    }

    /// Replaces the static transport.
    #[must_use]
    pub fn with_static_transport(mut self, transport: Arc<dyn StaticTransport>) -> Self {
        self.static_transport = Some(transport);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }
}
