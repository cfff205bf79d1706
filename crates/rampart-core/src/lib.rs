//! Rampart Core - engine-facing contracts for the Rampart gateway.
//!
//! This crate defines the seam between an HTTP-framework adapter and a
//! pluggable request-inspection engine (a WAF core). It carries no HTTP
//! types and no framework code; adapters such as `rampart-axum` sit on one
//! side of the seam, engine bindings on the other.
//!
//! ## What lives here
//!
//! - [`InspectionEngine`] / [`EngineTransaction`]: the phased transaction
//!   protocol an engine implements (connection, request line, headers,
//!   body, release)
//! - [`BodySource`]: the pull stream adapters feed request bodies through
//! - [`Interruption`]: an engine's verdict that a request must not proceed
//! - [`EngineConfig`]: behavior knobs handed to an [`EngineBuilder`] at
//!   process start
//! - [`MatchedRuleEvent`] / [`MatchSink`]: rule-match delivery out of the
//!   engine's error log

mod config;
mod engine;
mod error;
mod event;
mod interruption;

pub use config::{
    DebugSink, EngineConfig, EngineMode, TracingDebugSink, DEFAULT_DIRECTIVES_FILE,
    DEFAULT_REQUEST_BODY_IN_MEMORY_LIMIT, DEFAULT_REQUEST_BODY_LIMIT,
    DEFAULT_RESPONSE_BODY_LIMIT,
};
pub use engine::{
    BodyIngest, BodySource, EngineBuilder, EngineTransaction, InspectionEngine, RequestScope,
    ScopedEngine,
};
pub use error::{EngineError, Result};
pub use event::{MatchSink, MatchedRuleEvent, Severity};
pub use interruption::{Interruption, InterruptionAction};
