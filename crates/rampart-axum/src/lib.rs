//! Rampart Axum - request-inspection gateway middleware for axum.
//!
//! This crate gates an axum application behind a WAF-style inspection
//! engine (any [`rampart_core::InspectionEngine`]): every request is walked
//! through the engine's phases before the application sees it, and blocked
//! requests are answered by the gateway itself.
//!
//! ## Features
//!
//! - Engine built once per process, with recorded permanent failure
//! - Connection, request-line, header, and body phases in wire order
//! - Header-phase blocks answered without reading the body
//! - Allowed bodies replayed byte-for-byte to the downstream handler
//! - `X-WAF-Blocked: true` marker and `{code, msg}` JSON on every block
//! - Transaction release on every exit path, panics included
//!
//! ## Architecture
//!
//! ```text
//! Client Request → waf_middleware → engine initialized? ──no──▶ 500
//!                                        │ yes
//!                                        ▼
//!                                  RequestView + transaction
//!                                        │
//!                                  inspection pipeline ──block──▶ 403 {code, msg}
//!                                        │ allow                  X-WAF-Blocked: true
//!                                        ▼
//!                                  downstream handler (original body replayed)
//! ```
//!
//! Wire-up: initialize once at startup, then install the middleware.
//!
//! ```text
//! rampart_axum::initialize(config, &my_engine_builder)?;
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(axum::middleware::from_fn(rampart_axum::waf_middleware));
//! ```

mod capture;
mod lifecycle;
mod middleware;
mod pipeline;
mod translate;
mod view;

#[cfg(test)]
mod testsupport;

pub use capture::{known_empty, BodyCapture};
pub use lifecycle::{
    initialize, initialize_with_defaults, set_block_message, set_fallback_status,
    tracing_match_sink, EngineHandle, Gateway, InitError, DEFAULT_BLOCK_MESSAGE,
};
pub use middleware::waf_middleware;
pub use pipeline::{inspect, PipelineError, PipelineVerdict};
pub use translate::{blocked_response, error_response, status_for, BLOCKED_HEADER};
pub use view::{RequestView, ViewError};
