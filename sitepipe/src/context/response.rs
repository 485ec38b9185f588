//! Per-request response state.

use crate::errors::SerializationError;
use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Serialize;
use std::fmt;

/// Content type used for rendered templates.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";
/// Content type used for serialized payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
/// Content type used for plain fallback bodies.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

/// Structured data that can be turned into JSON on demand.
///
/// Implemented for every `Serialize` type, so a controller can hand over its
/// own types and serialization happens (and may fail) only when emitted.
pub trait PayloadData: Send + Sync {
    /// Serializes the data to JSON bytes.
    fn to_json(&self) -> Result<Vec<u8>, serde_json::Error>;

    /// Converts the data to a JSON value for rendering.
    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl<T> PayloadData for T
where
    T: Serialize + Send + Sync,
{
    fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Data a controller hands to the render and emit stages.
#[derive(Default)]
pub enum Payload {
    /// No payload was set.
    #[default]
    None,
    /// Already stringified text, sent as is.
    Text(String),
    /// Raw bytes, sent as is.
    Bytes(Bytes),
    /// Structured data, serialized when needed.
    Data(Box<dyn PayloadData>),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Data(_) => write!(f, "Data(..)"),
        }
    }
}

/// The response half of one pipeline run.
#[derive(Debug)]
pub struct ResponseContext {
    status: StatusCode,
    headers: HeaderMap,
    payload: Payload,
    rendered_text: Option<String>,
    body: Option<Bytes>,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseContext {
    /// Creates an empty 200 response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            payload: Payload::None,
            rendered_text: None,
            body: None,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Sets structured payload data.
    pub fn set_payload<T>(&mut self, data: T)
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.payload = Payload::Data(Box::new(data));
    }

    /// Sets an already stringified payload.
    pub fn set_text_payload(&mut self, text: impl Into<String>) {
        self.payload = Payload::Text(text.into());
    }

    /// Sets a raw bytes payload.
    pub fn set_bytes_payload(&mut self, bytes: impl Into<Bytes>) {
        self.payload = Payload::Bytes(bytes.into());
    }

    /// Converts the payload into render data.
    ///
    /// A missing payload renders as an empty object.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if structured data cannot be represented as JSON.
    pub fn payload_value(&self) -> Result<serde_json::Value, SerializationError> {
        match &self.payload {
            Payload::None => Ok(serde_json::Value::Object(serde_json::Map::new())),
            Payload::Text(text) => Ok(serde_json::Value::String(text.clone())),
            Payload::Bytes(bytes) => Ok(serde_json::Value::String(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
            Payload::Data(data) => Ok(data.to_value()?),
        }
    }

    /// Returns the rendered template text, if any.
    #[must_use]
    pub fn rendered_text(&self) -> Option<&str> {
        self.rendered_text.as_deref()
    }

    /// Stores rendered template text for the emit stage.
    pub fn set_rendered_text(&mut self, text: String) {
        self.rendered_text = Some(text);
    }

    /// Writes the response body with a content type.
    pub fn write(&mut self, content_type: &str, body: impl Into<Bytes>) {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(CONTENT_TYPE, value);
        }
        self.body = Some(body.into());
    }

    /// Returns true once a body has been written.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.body.is_some()
    }

    /// Returns the written body.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns the written body as text, lossily decoded.
    #[must_use]
    pub fn body_text(&self) -> String {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// Converts into an HTTP response.
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body.unwrap_or_default()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
