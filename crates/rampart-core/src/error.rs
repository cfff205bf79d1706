//! Error types for the engine seam.

use thiserror::Error;

/// Errors crossing the engine interface.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine rejected the assembled configuration.
    #[error("configuration rejected: {0}")]
    Config(String),

    /// A rule source failed to load or parse.
    #[error("rule source error: {0}")]
    RuleSource(String),

    /// Reading the request body out of the server failed mid-ingestion.
    #[error("body read failed: {0}")]
    BodyRead(String),

    /// Engine-internal failure during phase evaluation.
    #[error("engine failure: {0}")]
    Internal(String),
}

/// Result type for engine-seam operations.
pub type Result<T> = std::result::Result<T, EngineError>;
