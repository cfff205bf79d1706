//! Body capture and replay.
//!
//! The engine pulls request-body chunks through [`BodyCapture`]; every byte
//! it pulls is retained inside the engine's transaction. After inspection
//! the capture is folded back into an [`axum::body::Body`] that yields the
//! retained prefix first and the untouched remainder of the original stream
//! after it, so the downstream handler sees exactly the bytes the client
//! sent, once, in order.

use async_trait::async_trait;
use axum::body::{Body, BodyDataStream, Bytes, HttpBody};
use futures::StreamExt;
use rampart_core::{BodySource, EngineError};

/// Whether the body's size hint proves it empty.
///
/// Streaming bodies have no exact hint and report `false`; the engine then
/// decides by pulling.
pub fn known_empty(body: &Body) -> bool {
    matches!(HttpBody::size_hint(body).exact(), Some(0))
}

/// A request body mid-inspection.
///
/// Wraps the original body's data stream and counts what the engine pulls.
/// Chunks are handed to the engine as-is; the capture itself keeps no copy.
pub struct BodyCapture {
    stream: BodyDataStream,
    bytes_pulled: u64,
}

impl BodyCapture {
    /// Starts capturing the given body.
    pub fn new(body: Body) -> Self {
        Self {
            stream: body.into_data_stream(),
            bytes_pulled: 0,
        }
    }

    /// Bytes the engine has pulled so far.
    pub fn bytes_pulled(&self) -> u64 {
        self.bytes_pulled
    }

    /// Rebuilds the downstream body: `retained` first, then whatever the
    /// engine never pulled.
    ///
    /// `retained` must be the engine's copy of every pulled byte; passing
    /// anything else breaks replay.
    pub fn into_replay(self, retained: Bytes) -> Body {
        if retained.is_empty() {
            return Body::from_stream(self.stream);
        }
        Body::from_stream(
            futures::stream::iter([Ok::<_, axum::Error>(retained)]).chain(self.stream),
        )
    }
}

impl std::fmt::Debug for BodyCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyCapture")
            .field("bytes_pulled", &self.bytes_pulled)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BodySource for BodyCapture {
    async fn next_chunk(&mut self) -> rampart_core::Result<Option<Bytes>> {
        match self.stream.next().await {
            Some(Ok(chunk)) => {
                self.bytes_pulled += chunk.len() as u64;
                Ok(Some(chunk))
            }
            Some(Err(err)) => Err(EngineError::BodyRead(err.to_string())),
            None => Ok(None),
        }
    }
}
