//! Writes rendered HTML or the serialized payload.

use crate::context::{
    Payload, RequestContext, ResponseContext, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE,
};
use crate::core::{StageKind, StageOutput};
use crate::errors::{SerializationError, SitepipeError};
use super::Stage;
use async_trait::async_trait;
use axum::body::Bytes;

/// Sends whatever the earlier stages produced and finishes the request.
///
/// Rendered text wins over the payload. Text and byte payloads are sent
/// unmodified; structured payloads are serialized to JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitStage;

impl EmitStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for EmitStage {
    fn name(&self) -> &str {
        "emit"
    }

    fn kind(&self) -> StageKind {
        StageKind::Emit
    }

    async fn execute(
        &self,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Result<StageOutput, SitepipeError> {
        if let Some(text) = res.rendered_text().map(str::to_owned) {
            res.write(HTML_CONTENT_TYPE, text);
        } else {
            let body = match res.payload() {
                Payload::None => Bytes::new(),
                Payload::Text(text) => Bytes::from(text.clone()),
                Payload::Bytes(bytes) => bytes.clone(),
                Payload::Data(data) => Bytes::from(data.to_json().map_err(SerializationError::from)?),
            };
            res.write(JSON_CONTENT_TYPE, body);
        }

        req.finish();
        Ok(StageOutput::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    async fn emit(res: &mut ResponseContext) -> Result<StageOutput, SitepipeError> {
        let mut req = RequestContext::get("/");
        let output = EmitStage::new().execute(&mut req, res).await;
        if output.is_ok() {
            assert!(req.is_finished());
        }
        output
    }

    #[tokio::test]
    async fn test_rendered_text_is_sent_as_html() {
        let mut res = ResponseContext::new();
        res.set_payload(json!({"ignored": true}));
        res.set_rendered_text("<h1>Hello</h1>".to_string());

        emit(&mut res).await.unwrap();

        assert_eq!(res.body_text(), "<h1>Hello</h1>");
        assert_eq!(res.headers().get(CONTENT_TYPE).unwrap(), HTML_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_payload_is_sent_as_json() {
        let mut res = ResponseContext::new();
        res.set_payload(json!({"foo": "bar"}));

        emit(&mut res).await.unwrap();

        assert_eq!(res.body_text(), r#"{"foo":"bar"}"#);
        assert_eq!(res.headers().get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_stringified_payload_passes_through() {
        let mut res = ResponseContext::new();
        res.set_text_payload(r#"{"already":"text"}"#);
        emit(&mut res).await.unwrap();
        assert_eq!(res.body_text(), r#"{"already":"text"}"#);

        let mut res = ResponseContext::new();
        res.set_bytes_payload(&b"raw"[..]);
        emit(&mut res).await.unwrap();
        assert_eq!(res.body_text(), "raw");
    }

    #[tokio::test]
    async fn test_unserializable_payload_fails() {
        let mut res = ResponseContext::new();
        let mut data = HashMap::new();
        data.insert((1u8, 2u8), "tuple keys");
        res.set_payload(data);

        let err = emit(&mut res).await.unwrap_err();
        assert!(matches!(err, SitepipeError::Serialization(_)));
        assert!(!res.is_written());
    }
}
