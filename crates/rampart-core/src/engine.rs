//! The seam between the gateway and a rule engine.
//!
//! An [`InspectionEngine`] hands out one [`EngineTransaction`] per request.
//! The gateway drives the transaction through a fixed order: connection,
//! request line, headers, then (optionally) body, and finally releases it
//! with `process_logging` followed by `close`. Engines that key per-request
//! state off an external id additionally implement [`ScopedEngine`]; the
//! gateway probes for that capability once, right after engine construction.
//!
//! Body bytes flow in through a caller-supplied [`BodySource`]. Every byte
//! an engine pulls from the source must be returned verbatim by
//! [`EngineTransaction::request_body_reader`], because the gateway stitches
//! those bytes back in front of whatever the source still holds.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::interruption::Interruption;

/// A process-wide rule engine. Shared across requests behind an `Arc`.
pub trait InspectionEngine: Send + Sync {
    /// Opens a fresh per-request transaction.
    fn new_transaction(&self) -> Box<dyn EngineTransaction>;

    /// Returns the request-scoped view of this engine, if it has one.
    fn as_scoped(&self) -> Option<&dyn ScopedEngine> {
        None
    }
}

/// An engine that can tie transactions to an externally supplied request id.
pub trait ScopedEngine: InspectionEngine {
    /// Opens a transaction bound to the given request scope.
    fn new_scoped_transaction(&self, scope: &RequestScope) -> Box<dyn EngineTransaction>;
}

/// Per-request context handed to [`ScopedEngine::new_scoped_transaction`].
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    /// Correlation id lifted from the request, when present.
    pub request_id: Option<String>,
}

impl RequestScope {
    /// Creates a scope carrying the given request id.
    pub fn with_request_id(id: impl Into<String>) -> Self {
        Self {
            request_id: Some(id.into()),
        }
    }
}

/// Outcome of feeding a request body into a transaction.
#[derive(Debug, Default)]
pub struct BodyIngest {
    /// Interruption raised while ingesting, if any.
    pub interruption: Option<Interruption>,
    /// Bytes the engine consumed from the source.
    pub bytes_read: u64,
}

impl BodyIngest {
    /// An ingest that consumed `bytes_read` bytes without interrupting.
    pub fn clean(bytes_read: u64) -> Self {
        Self {
            interruption: None,
            bytes_read,
        }
    }

    /// An ingest cut short by an interruption after `bytes_read` bytes.
    pub fn interrupted(interruption: Interruption, bytes_read: u64) -> Self {
        Self {
            interruption: Some(interruption),
            bytes_read,
        }
    }
}

/// Pull-based byte stream handed to [`EngineTransaction::read_request_body_from`].
#[async_trait]
pub trait BodySource: Send {
    /// Returns the next chunk, or `None` once the stream is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// Per-request engine state.
///
/// Exclusively owned by one request invocation; never shared. Apart from
/// `process_logging` and `close`, which the gateway's release guard calls on
/// every exit path, no method may be called after an earlier phase returned
/// an interruption.
#[async_trait]
pub trait EngineTransaction: Send {
    /// Records the TCP endpoints of the request.
    fn process_connection(
        &mut self,
        client_addr: &str,
        client_port: u16,
        server_addr: &str,
        server_port: u16,
    );

    /// Records the request line: target, method, protocol version.
    fn process_uri(&mut self, uri: &str, method: &str, proto: &str);

    /// Adds one request header to the transaction.
    fn add_request_header(&mut self, name: &str, value: &str);

    /// Records the server name the request was addressed to.
    fn set_server_name(&mut self, name: &str);

    /// Evaluates the header phase.
    fn process_request_headers(&mut self) -> Option<Interruption>;

    /// Whether this transaction is willing to buffer a request body.
    fn request_body_accessible(&self) -> bool;

    /// Pulls the body from `source` until exhaustion, an internal limit, or
    /// an interruption, whichever comes first.
    async fn read_request_body_from(&mut self, source: &mut dyn BodySource) -> Result<BodyIngest>;

    /// Returns the body bytes this transaction retained during ingest.
    fn request_body_reader(&mut self) -> Result<Bytes>;

    /// Evaluates the body phase.
    fn process_request_body(&mut self) -> Result<Option<Interruption>>;

    /// Whether rule evaluation is switched off for this transaction.
    fn rule_engine_off(&self) -> bool;

    /// Flushes audit logging. Called exactly once, at release.
    fn process_logging(&mut self);

    /// Releases engine-side resources. Called exactly once, after
    /// [`process_logging`](Self::process_logging).
    fn close(&mut self) -> Result<()>;
}

/// Constructs an engine from a validated config.
///
/// Implemented for any matching closure, so a gateway can be wired with
/// `|config| { ... }` directly.
pub trait EngineBuilder: Send + Sync {
    /// Builds the engine. Called at most once per process.
    fn build(&self, config: &EngineConfig) -> Result<Arc<dyn InspectionEngine>>;
}

impl<F> EngineBuilder for F
where
    F: Fn(&EngineConfig) -> Result<Arc<dyn InspectionEngine>> + Send + Sync,
{
    fn build(&self, config: &EngineConfig) -> Result<Arc<dyn InspectionEngine>> {
        self(config)
    }
}
