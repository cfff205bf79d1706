//! The phased inspection pipeline.
//!
//! One call to [`inspect`] drives a transaction through every phase the
//! engine sees, in the order a proxy would observe the wire:
//!
//! ```text
//! process_connection → process_uri → add_request_header (each header)
//!                                         │
//!                                         ▼
//!                              process_request_headers ──interruption──▶ Block
//!                                         │
//!                         body present and accessible?
//!                           │ yes                  │ no
//!                           ▼                      │
//!                  read_request_body_from ──interruption──▶ Block
//!                           │                      │
//!                  rebuild replayable body         │
//!                           └──────────┬───────────┘
//!                                      ▼
//!                              process_request_body ──interruption──▶ Block
//!                                      │
//!                                      ▼
//!                              Allow(original or replayed body)
//! ```
//!
//! A header-phase interruption means the body stream is never touched, so
//! a blocked upload costs no body bytes. The body evaluation phase runs
//! even when nothing was ingested; engines match query arguments there.
//! On the allow path the returned body replays exactly what the client
//! sent.

use axum::body::Body;
use axum::http::header::{HOST, TRANSFER_ENCODING};
use axum::http::HeaderMap;
use rampart_core::{EngineError, EngineTransaction, Interruption};
use thiserror::Error;
use tracing::debug;

use crate::capture::BodyCapture;
use crate::view::RequestView;

/// Engine failure surfaced while driving the phases.
#[derive(Debug, Error)]
#[error("request inspection failed: {0}")]
pub struct PipelineError(#[from] pub EngineError);

/// What the pipeline decided about a request.
pub enum PipelineVerdict {
    /// The request may proceed; hand this body to the downstream handler.
    Allow(Body),
    /// The request must be blocked.
    Block(Interruption),
}

/// Runs every inspection phase against `tx`.
///
/// The transaction must be freshly opened. `body` is consumed; the allow
/// verdict returns it (or a replay of it) for the downstream handler.
pub async fn inspect(
    tx: &mut dyn EngineTransaction,
    view: &RequestView,
    headers: &HeaderMap,
    body: Body,
) -> Result<PipelineVerdict, PipelineError> {
    tx.process_connection(&view.client_addr, view.client_port, "", 0);
    tx.process_uri(&view.target, &view.method, view.proto);

    feed_headers(tx, view, headers);
    if let Some(server_name) = view.server_name() {
        tx.set_server_name(server_name);
    }

    if let Some(interruption) = tx.process_request_headers() {
        debug!("Header phase interrupted by rule {:?}", interruption.rule_id);
        return Ok(PipelineVerdict::Block(interruption));
    }

    let body = if view.has_body && tx.request_body_accessible() {
        let mut capture = BodyCapture::new(body);
        let ingest = tx.read_request_body_from(&mut capture).await?;
        debug!(
            "Engine consumed {} body byte(s), {} pulled from the stream",
            ingest.bytes_read,
            capture.bytes_pulled()
        );
        if let Some(interruption) = ingest.interruption {
            return Ok(PipelineVerdict::Block(interruption));
        }
        let retained = tx.request_body_reader()?;
        capture.into_replay(retained)
    } else {
        if view.has_body {
            debug!("Body inspection disabled; forwarding body unread");
        }
        body
    };

    // Evaluation runs even when nothing was ingested; engines match query
    // arguments and header-derived variables in this phase.
    if let Some(interruption) = tx.process_request_body()? {
        return Ok(PipelineVerdict::Block(interruption));
    }

    Ok(PipelineVerdict::Allow(body))
}

/// Feeds the header map to the transaction, in map order, values as lossy
/// UTF-8. Host and Transfer-Encoding are synthesized afterwards when the
/// map does not carry them but the request head does (HTTP/2 authority,
/// hand-built requests).
fn feed_headers(tx: &mut dyn EngineTransaction, view: &RequestView, headers: &HeaderMap) {
    for (name, value) in headers.iter() {
        let value = String::from_utf8_lossy(value.as_bytes());
        tx.add_request_header(name.as_str(), &value);
    }

    if !headers.contains_key(HOST) {
        if let Some(host) = view.host.as_deref() {
            tx.add_request_header("host", host);
        }
    }
    if !headers.contains_key(TRANSFER_ENCODING) {
        if let Some(encoding) = view.transfer_encoding.as_deref() {
            tx.add_request_header("transfer-encoding", encoding);
        }
    }
}
