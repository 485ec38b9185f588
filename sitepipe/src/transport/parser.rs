//! The request parser seam and the built-in parser.

use crate::config::RequestParserOptions;
use crate::context::{ParsedBody, ParsedUrl, RequestContext};
use crate::errors::SitepipeError;
use async_trait::async_trait;
use axum::http::header::CONTENT_TYPE;
use std::io::ErrorKind;
use tracing::{debug, warn};

/// Parses the URL and body of a request, and releases whatever that parsing
/// acquired once the request is done.
#[async_trait]
pub trait RequestParser: Send + Sync + std::fmt::Debug {
    /// Populates the parsed URL and body.
    async fn parse(&self, req: &mut RequestContext) -> Result<(), SitepipeError>;

    /// Releases temporary storage held for the request.
    async fn cleanup(&self, req: &mut RequestContext) -> Result<(), SitepipeError>;
}

/// Parses query strings, JSON and urlencoded bodies.
///
/// Bodies larger than the spill threshold are written to the storage
/// directory, when one is configured, and removed again on cleanup.
#[derive(Debug, Clone, Default)]
pub struct BasicRequestParser {
    options: RequestParserOptions,
}

impl BasicRequestParser {
    /// Creates a parser.
    #[must_use]
    pub fn new(options: RequestParserOptions) -> Self {
        Self { options }
    }

    async fn parse_body(&self, req: &mut RequestContext) -> Result<ParsedBody, SitepipeError> {
        let raw = req.raw_body().clone();
        if raw.is_empty() {
            return Ok(ParsedBody::Empty);
        }
        if raw.len() > self.options.max_body_bytes {
            return Err(SitepipeError::stage(
                "parse",
                format!(
                    "request body of {} bytes exceeds the {} byte limit",
                    raw.len(),
                    self.options.max_body_bytes
                ),
            ));
        }

        if let Some(dir) = &self.options.storage_dir {
            if raw.len() > self.options.spill_threshold_bytes {
                tokio::fs::create_dir_all(dir).await?;
                let path = dir.join(format!("{}.body", req.request_id()));
                tokio::fs::write(&path, &raw).await?;
                debug!(path = %path.display(), bytes = raw.len(), "Stored request body");
                req.track_temp_file(path.clone());
                return Ok(ParsedBody::Stored(path));
            }
        }

        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let value = serde_json::from_slice(&raw)
                .map_err(|err| SitepipeError::stage("parse", format!("invalid JSON body: {err}")))?;
            Ok(ParsedBody::Json(value))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            Ok(ParsedBody::Form(
                url::form_urlencoded::parse(&raw).into_owned().collect(),
            ))
        } else {
            Ok(ParsedBody::Raw(raw))
        }
    }
}

#[async_trait]
impl RequestParser for BasicRequestParser {
    async fn parse(&self, req: &mut RequestContext) -> Result<(), SitepipeError> {
        let uri = req.uri();
        let url = ParsedUrl {
            pathname: uri.path().to_string(),
            query: uri
                .query()
                .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
                .unwrap_or_default(),
        };
        req.set_url_parsed(url);

        let body = self.parse_body(req).await?;
        req.set_body(body);
        Ok(())
    }

    async fn cleanup(&self, req: &mut RequestContext) -> Result<(), SitepipeError> {
        let mut first_error = None;
        for path in req.take_temp_files() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed temporary file"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Could not remove temporary file");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }
}
