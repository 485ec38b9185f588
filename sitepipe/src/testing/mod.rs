//! Testing utilities for sitepipe.
//!
//! This module provides:
//! - On-disk site fixtures
//! - Recording, failing and finishing stages
//! - Collaborators that fail on demand

mod fixtures;
mod mocks;

pub use fixtures::SiteFixture;
pub use mocks::{
    FailingCleanupParser, FailingStage, FailingStaticTransport, FinishingStage, RecordingStage,
    StageLog,
};
