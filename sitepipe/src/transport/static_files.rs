//! The static file transport seam and its filesystem implementation.

use crate::context::{RequestContext, ResponseContext};
use crate::errors::StaticTransportError;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Sends a file's bytes as the response body.
#[async_trait]
pub trait StaticTransport: Send + Sync + std::fmt::Debug {
    /// Writes the file at `path` into `res`.
    async fn stream(
        &self,
        req: &RequestContext,
        res: &mut ResponseContext,
        path: &Path,
    ) -> Result<(), StaticTransportError>;
}

/// Reads files from disk and labels them by extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStaticTransport;

#[async_trait]
impl StaticTransport for FsStaticTransport {
    async fn stream(
        &self,
        req: &RequestContext,
        res: &mut ResponseContext,
        path: &Path,
    ) -> Result<(), StaticTransportError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| StaticTransportError::new(path, err))?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        debug!(
            path = %path.display(),
            bytes = bytes.len(),
            content_type = %mime,
            "{}sending static file",
            req.log_context()
        );
        res.write(mime.as_ref(), bytes);
        Ok(())
    }
}
