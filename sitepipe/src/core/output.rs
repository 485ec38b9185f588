//! Stage output type with factory methods.

use super::StageStatus;
use serde::{Deserialize, Serialize};

/// What a stage reports after running successfully.
///
/// Failures are reported through `Err(SitepipeError)` instead, so an output is
/// either a completed or a skipped stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    /// The status of the stage execution.
    pub status: StageStatus,

    /// Skip reason (for skipped executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl Default for StageOutput {
    fn default() -> Self {
        Self::ok()
    }
}

impl StageOutput {
    /// Creates a completed output.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: StageStatus::Ok,
            skip_reason: None,
        }
    }

    /// Creates a skip output with a reason.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skip,
            skip_reason: Some(reason.into()),
        }
    }

    /// Returns true if the stage was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == StageStatus::Skip
    }
}
