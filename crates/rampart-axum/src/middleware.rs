//! The axum-facing adapter.
//!
//! [`waf_middleware`] is a plain `async fn` for
//! `axum::middleware::from_fn`, bound to the process-wide gateway.
//! [`Gateway::handle`] is the same gate on an explicit instance, which is
//! what tests and embedders compose.
//!
//! One transaction is opened per request and released exactly once on
//! every exit path: allow, block, engine failure, inspection panic, and
//! unwinding of the downstream handler. Release (`process_logging` then
//! `close`) runs after the response is produced, so audit logging sees the
//! whole request.

use std::panic::AssertUnwindSafe;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use futures::FutureExt;
use rampart_core::{EngineTransaction, RequestScope};
use tracing::{debug, error, warn};

use crate::capture::known_empty;
use crate::lifecycle::{self, Gateway, InitError};
use crate::pipeline::{self, PipelineVerdict};
use crate::translate;
use crate::view::RequestView;

// Client-facing diagnostics, sent as `{code: 0, msg: ...}` bodies.
const MSG_INIT_FAILED: &str = "WAF initialization failed";
const MSG_NOT_INITIALIZED: &str = "WAF instance not initialized";
const MSG_CONVERT_FAILED: &str = "Failed to convert request";
const MSG_PROCESSING_FAILED: &str = "WAF request processing failed";

/// Gate for the process-wide gateway, shaped for
/// `axum::middleware::from_fn`.
pub async fn waf_middleware(request: Request, next: Next) -> Response {
    lifecycle::global().handle(request, next).await
}

impl Gateway {
    /// Inspects one request and either forwards it downstream or answers
    /// it on the engine's behalf.
    pub async fn handle(&self, request: Request, next: Next) -> Response {
        let engine = match self.engine() {
            Ok(engine) => engine,
            Err(InitError::NotInitialized) => {
                error!("Rejecting request: inspection engine was never initialized");
                return translate::error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    MSG_NOT_INITIALIZED,
                );
            }
            Err(err) => {
                error!("Rejecting request: {err}");
                return translate::error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    MSG_INIT_FAILED,
                );
            }
        };

        let (parts, body) = request.into_parts();
        let has_body = !known_empty(&body);
        let view = match RequestView::from_parts(&parts, has_body) {
            Ok(view) => view,
            Err(err) => {
                warn!("Failed to convert request for inspection: {err}");
                return translate::error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    MSG_CONVERT_FAILED,
                );
            }
        };

        let scope = match view.request_id.clone() {
            Some(id) => RequestScope::with_request_id(id),
            None => RequestScope::default(),
        };
        let mut guard = TransactionGuard::new(engine.open_transaction(&scope));

        if guard.tx().rule_engine_off() {
            debug!("Rule engine off; forwarding without inspection");
            return next.run(Request::from_parts(parts, body)).await;
        }

        let outcome =
            AssertUnwindSafe(pipeline::inspect(guard.tx_mut(), &view, &parts.headers, body))
                .catch_unwind()
                .await;

        match outcome {
            Ok(Ok(PipelineVerdict::Allow(body))) => {
                next.run(Request::from_parts(parts, body)).await
            }
            Ok(Ok(PipelineVerdict::Block(interruption))) => {
                warn!(
                    "Blocked {} {} ({})",
                    view.method,
                    view.target,
                    interruption.summary()
                );
                translate::blocked_response(
                    translate::status_for(&interruption, self.fallback_status()),
                    &self.block_message(),
                )
            }
            Ok(Err(err)) => {
                error!("{err} for {} {}", view.method, view.target);
                translate::error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    MSG_PROCESSING_FAILED,
                )
            }
            Err(_panic) => {
                error!(
                    "Inspection panicked for {} {}; answering with a server error",
                    view.method, view.target
                );
                translate::error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    MSG_PROCESSING_FAILED,
                )
            }
        }
    }
}

/// Releases a transaction exactly once when it goes out of scope.
struct TransactionGuard {
    tx: Box<dyn EngineTransaction>,
}

impl TransactionGuard {
    fn new(tx: Box<dyn EngineTransaction>) -> Self {
        Self { tx }
    }

    fn tx(&self) -> &dyn EngineTransaction {
        self.tx.as_ref()
    }

    fn tx_mut(&mut self) -> &mut dyn EngineTransaction {
        self.tx.as_mut()
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        // Release may run while unwinding; a panicking engine must not
        // escalate that into an abort.
        let tx = &mut self.tx;
        let release = std::panic::catch_unwind(AssertUnwindSafe(|| {
            tx.process_logging();
            if let Err(err) = tx.close() {
                warn!("Transaction close failed: {err}");
            }
        }));
        if release.is_err() {
            error!("Transaction release panicked");
        }
    }
}
