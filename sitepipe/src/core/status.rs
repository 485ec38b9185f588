//! Stage status and kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role a stage plays in the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Parses the URL and body of the request.
    Parse,
    /// Resolves the URL to a controller, template or static file.
    Route,
    /// Streams a matched static file.
    ServeStatic,
    /// Invokes a matched controller, or the not-found procedure.
    RunController,
    /// Renders a matched template.
    Render,
    /// Writes rendered HTML or the JSON payload.
    Emit,
    /// Releases per-request resources. Always runs, even after failures.
    Cleanup,
    /// A user supplied stage.
    Custom,
}

impl Default for StageKind {
    fn default() -> Self {
        Self::Custom
    }
}

impl StageKind {
    /// Returns true if the stage runs regardless of earlier failures or a
    /// finished request.
    #[must_use]
    pub fn always_runs(&self) -> bool {
        matches!(self, Self::Cleanup)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Route => write!(f, "route"),
            Self::ServeStatic => write!(f, "serve_static"),
            Self::RunController => write!(f, "run_controller"),
            Self::Render => write!(f, "render"),
            Self::Emit => write!(f, "emit"),
            Self::Cleanup => write!(f, "cleanup"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// The execution status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage did its work.
    Ok,
    /// Stage had nothing to do, or was short-circuited.
    Skip,
    /// Stage failed.
    Fail,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::Ok
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skip => write!(f, "skip"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Skip)
    }
}
