//! Per-request state shared by every stage.

use super::Resolution;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use std::path::PathBuf;
use uuid::Uuid;

/// The URL after the parse stage has looked at it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUrl {
    /// The path component, without the query string.
    pub pathname: String,
    /// Decoded query pairs in request order.
    pub query: Vec<(String, String)>,
}

impl ParsedUrl {
    /// Returns the first query value for `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A request body after parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParsedBody {
    /// No body was sent.
    #[default]
    Empty,
    /// A JSON document.
    Json(serde_json::Value),
    /// An urlencoded form.
    Form(Vec<(String, String)>),
    /// Bytes of an unrecognised content type.
    Raw(Bytes),
    /// A large body written to temporary storage.
    Stored(PathBuf),
}

/// The request half of one pipeline run.
///
/// Owned by the pipeline for the lifetime of the request; stages get it by
/// mutable reference, one at a time.
#[derive(Debug)]
pub struct RequestContext {
    request_id: Uuid,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    raw_body: Bytes,
    log_context: String,
    url_parsed: Option<ParsedUrl>,
    body: ParsedBody,
    finished: bool,
    render_requested: bool,
    resolution: Resolution,
    temp_files: Vec<PathBuf>,
}

impl RequestContext {
    /// Creates a context for an inbound request.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, raw_body: Bytes) -> Self {
        let request_id = Uuid::new_v4();
        let log_context = format!("req.id: {request_id} url: {uri} - ");
        Self {
            request_id,
            method,
            uri,
            headers,
            raw_body,
            log_context,
            url_parsed: None,
            body: ParsedBody::Empty,
            finished: false,
            render_requested: true,
            resolution: Resolution::default(),
            temp_files: Vec::new(),
        }
    }

    /// Creates a bodiless GET request for `uri`.
    #[cfg(test)]
    pub(crate) fn get(uri: &str) -> Self {
        let uri = uri
            .parse()
            .unwrap_or_else(|err| panic!("invalid test URI {uri:?}: {err}"));
        Self::new(Method::GET, uri, HeaderMap::new(), Bytes::new())
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Returns the log prefix derived from the request ID and original URL.
    #[must_use]
    pub fn log_context(&self) -> &str {
        &self.log_context
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the original request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the unparsed body bytes.
    #[must_use]
    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// Returns the parsed URL, if the parse stage ran.
    #[must_use]
    pub fn url_parsed(&self) -> Option<&ParsedUrl> {
        self.url_parsed.as_ref()
    }

    /// Sets the parsed URL.
    pub fn set_url_parsed(&mut self, url: ParsedUrl) {
        self.url_parsed = Some(url);
    }

    /// Drops the parsed URL.
    pub fn clear_url_parsed(&mut self) {
        self.url_parsed = None;
    }

    /// Returns the parsed body.
    #[must_use]
    pub fn body(&self) -> &ParsedBody {
        &self.body
    }

    /// Sets the parsed body.
    pub fn set_body(&mut self, body: ParsedBody) {
        self.body = body;
    }

    /// Returns true once a stage has written the response.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Marks the request as finished. Later stages must not write.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Returns false if rendering was suppressed for this request.
    #[must_use]
    pub fn render_requested(&self) -> bool {
        self.render_requested
    }

    /// Enables or suppresses the render stage.
    pub fn set_render_requested(&mut self, render: bool) {
        self.render_requested = render;
    }

    /// Returns the route resolution.
    #[must_use]
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Returns the route resolution for error-path substitution.
    pub fn resolution_mut(&mut self) -> &mut Resolution {
        &mut self.resolution
    }

    /// Replaces the route resolution.
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    /// Registers a temporary file to delete during cleanup.
    pub fn track_temp_file(&mut self, path: PathBuf) {
        self.temp_files.push(path);
    }

    /// Returns the tracked temporary files.
    #[must_use]
    pub fn temp_files(&self) -> &[PathBuf] {
        &self.temp_files
    }

    /// Takes ownership of the tracked temporary files.
    pub fn take_temp_files(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.temp_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_defaults() {
        let req = RequestContext::get("/foo?bar=1");

        assert!(!req.is_finished());
        assert!(req.render_requested());
        assert!(req.resolution().is_empty());
        assert!(req.url_parsed().is_none());
        assert_eq!(req.uri().path(), "/foo");
    }

    #[test]
    #[should_panic(expected = "invalid test URI")]
    fn test_invalid_uri_is_not_rewritten_to_index() {
        let _ = RequestContext::get("/bad path");
    }

    #[test]
    fn test_log_context_mentions_id_and_url() {
        let req = RequestContext::get("/foo");
        let prefix = req.log_context();

        assert!(prefix.contains(&req.request_id().to_string()));
        assert!(prefix.contains("url: /foo"));
    }

    #[test]
    fn test_query_value_lookup() {
        let url = ParsedUrl {
            pathname: "/".to_string(),
            query: vec![("a".to_string(), "1".to_string()), ("a".to_string(), "2".to_string())],
        };

        assert_eq!(url.query_value("a"), Some("1"));
        assert_eq!(url.query_value("b"), None);
    }

    #[test]
    fn test_take_temp_files_drains() {
        let mut req = RequestContext::get("/");
        req.track_temp_file(PathBuf::from("/tmp/a"));

        assert_eq!(req.take_temp_files(), vec![PathBuf::from("/tmp/a")]);
        assert!(req.temp_files().is_empty());
    }
}
