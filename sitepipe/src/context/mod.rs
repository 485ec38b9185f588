//! Request and response contexts for pipeline execution.
//!
//! This module provides:
//! - The per-request context stages read and flag
//! - The per-request response context stages write to
//! - The resolution record produced by routing

mod request;
mod resolution;
mod response;

pub use request::{ParsedBody, ParsedUrl, RequestContext};
pub use resolution::Resolution;
pub use response::{
    Payload, PayloadData, ResponseContext, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE,
    TEXT_CONTENT_TYPE,
};
