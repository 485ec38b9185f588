//! Error types for the sitepipe request pipeline.
//!
//! Every failure is terminal for the request it happens in. The pipeline hands
//! the error to a single error handler which turns it into a 500 response; a
//! "target not found" outcome is not an error and never shows up here.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for sitepipe operations.
#[derive(Debug, Error)]
pub enum SitepipeError {
    /// The route matcher failed.
    #[error("{0}")]
    Resolution(#[from] ResolutionError),

    /// Template compilation or rendering failed.
    #[error("{0}")]
    Template(#[from] TemplateError),

    /// The static file transport failed.
    #[error("{0}")]
    StaticTransport(#[from] StaticTransportError),

    /// The response payload could not be serialized.
    #[error("{0}")]
    Serialization(#[from] SerializationError),

    /// Any other stage failure.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// The HTTP listener could not be started or stopped.
    #[error("Server error: {0}")]
    Server(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SitepipeError {
    /// Creates a pipeline error attributed to a stage.
    #[must_use]
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline(PipelineError::new(message).in_stage(stage))
    }

    /// Returns the HTTP status code this error maps to.
    ///
    /// No failure is recoverable at the request level, so this is always 500.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        500
    }

    /// Returns a short, stable label for logs and events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resolution(_) => "resolution",
            Self::Template(err) => err.kind.as_str(),
            Self::StaticTransport(_) => "static_transport",
            Self::Serialization(_) => "serialization",
            Self::Pipeline(_) => "pipeline",
            Self::Server(_) => "server",
            Self::Io(_) => "io",
        }
    }
}

/// Error raised when the route matcher cannot resolve a path.
#[derive(Debug, Clone, Error)]
#[error("Could not resolve route '{path}': {message}")]
pub struct ResolutionError {
    /// The logical path being resolved.
    pub path: String,
    /// What went wrong.
    pub message: String,
}

impl ResolutionError {
    /// Creates a new resolution error.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// The category of a template failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateErrorKind {
    /// The template file could not be read.
    ReadFailed,
    /// An include directive referenced a file that does not exist.
    IncludeNotFound,
    /// An include chain revisits a file that is still being expanded.
    CircularInclude,
    /// The expanded text is not a valid template.
    CompileFailed,
    /// The compiled template failed while rendering data.
    RenderFailed,
}

impl TemplateErrorKind {
    /// Returns the snake_case label of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadFailed => "template_read_failed",
            Self::IncludeNotFound => "template_include_not_found",
            Self::CircularInclude => "template_circular_include",
            Self::CompileFailed => "template_compile_failed",
            Self::RenderFailed => "template_render_failed",
        }
    }
}

impl fmt::Display for TemplateErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::IncludeNotFound => write!(f, "include not found"),
            Self::CircularInclude => write!(f, "circular include"),
            Self::CompileFailed => write!(f, "compile failed"),
            Self::RenderFailed => write!(f, "render failed"),
        }
    }
}

/// Error raised by the template compiler or a compiled template.
#[derive(Debug, Clone, Error)]
#[error("Template {kind} ({}): {message}", .path.display())]
pub struct TemplateError {
    /// The failure category.
    pub kind: TemplateErrorKind,
    /// The file the failure is attributed to.
    pub path: PathBuf,
    /// The include chain that led to the failure, outermost first.
    pub chain: Vec<PathBuf>,
    /// Human readable detail.
    pub message: String,
}

impl TemplateError {
    /// Creates a new template error.
    #[must_use]
    pub fn new(kind: TemplateErrorKind, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            chain: Vec::new(),
            message: message.into(),
        }
    }

    /// Sets the include chain.
    #[must_use]
    pub fn with_chain(mut self, chain: Vec<PathBuf>) -> Self {
        self.chain = chain;
        self
    }

    /// Creates a read failure from an IO error.
    #[must_use]
    pub fn read_failed(path: &Path, err: &std::io::Error) -> Self {
        Self::new(TemplateErrorKind::ReadFailed, path, err.to_string())
    }

    /// Creates an include-not-found error.
    #[must_use]
    pub fn include_not_found(reference: &str, including: &Path, chain: Vec<PathBuf>) -> Self {
        Self::new(
            TemplateErrorKind::IncludeNotFound,
            including,
            format!("included file '{reference}' was not found"),
        )
        .with_chain(chain)
    }

    /// Creates a circular include error for `target` reached through `chain`.
    ///
    /// The message names the first file of the chain and the most recent one.
    #[must_use]
    pub fn circular(chain: Vec<PathBuf>, target: &Path) -> Self {
        let first = chain.first().map(|p| p.display().to_string()).unwrap_or_default();
        let last = chain.last().map(|p| p.display().to_string()).unwrap_or_default();
        Self::new(
            TemplateErrorKind::CircularInclude,
            target,
            format!(
                "{first} causes a circular include: {last} includes {} again",
                target.display()
            ),
        )
        .with_chain(chain)
    }

    /// Creates a compile failure.
    #[must_use]
    pub fn compile_failed(path: &Path, message: impl Into<String>) -> Self {
        Self::new(TemplateErrorKind::CompileFailed, path, message)
    }

    /// Creates a render failure.
    #[must_use]
    pub fn render_failed(path: &Path, message: impl Into<String>) -> Self {
        Self::new(TemplateErrorKind::RenderFailed, path, message)
    }

    /// Returns the include chain joined for logging.
    #[must_use]
    pub fn chain_display(&self) -> String {
        self.chain
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Error raised when a static file cannot be sent.
#[derive(Debug, Error)]
#[error("Could not send static file '{}': {source}", .path.display())]
pub struct StaticTransportError {
    /// The file being sent.
    pub path: PathBuf,
    /// The underlying IO error.
    #[source]
    pub source: std::io::Error,
}

impl StaticTransportError {
    /// Creates a new static transport error.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Error raised when a payload is not representable as JSON.
#[derive(Debug, Error)]
#[error("Could not serialize payload: {0}")]
pub struct SerializationError(#[from] pub serde_json::Error);

/// A stage failure that is not otherwise classified.
#[derive(Debug, Clone)]
pub struct PipelineError {
    /// The stage the failure happened in, if known.
    pub stage: Option<String>,
    /// What went wrong.
    pub message: String,
}

impl PipelineError {
    /// Creates a new pipeline error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            stage: None,
            message: message.into(),
        }
    }

    /// Attributes the error to a stage.
    #[must_use]
    pub fn in_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stage {
            Some(stage) => write!(f, "Stage '{stage}' failed: {}", self.message),
            None => write!(f, "Pipeline error: {}", self.message),
        }
    }
}

impl std::error::Error for PipelineError {}
