//! Pipeline execution.
//!
//! This module provides:
//! - The ordered stage executor
//! - The fan-out join used for concurrent sub-tasks
//! - The error handler that turns failures into responses

mod error_handler;
mod executor;
mod join;

#[cfg(test)]
mod integration_tests;

pub use error_handler::{DefaultErrorHandler, ErrorHandler, INTERNAL_ERROR_BODY};
pub use executor::{Pipeline, PipelineReport, StageRecord};
pub use join::join_settled;
