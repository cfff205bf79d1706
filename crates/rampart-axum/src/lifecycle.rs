//! Gateway lifecycle: one inspection engine per process, built exactly once.
//!
//! [`Gateway`] owns the engine cell plus the two request-time knobs (block
//! message, fallback status). A process normally talks to one static
//! gateway through the free functions below; tests compose their own
//! `Gateway` values.
//!
//! The first [`Gateway::initialize`] call decides the engine's fate for the
//! life of the process: success hands out an [`EngineHandle`], failure is
//! recorded and returned to every later caller without ever retrying the
//! builder.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rampart_core::{
    EngineBuilder, EngineConfig, EngineTransaction, InspectionEngine, MatchSink, MatchedRuleEvent,
    RequestScope, Severity,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Message returned to blocked clients unless replaced at startup.
pub const DEFAULT_BLOCK_MESSAGE: &str = "Request blocked by Web Application Firewall";

/// Why the engine is unavailable.
#[derive(Debug, Clone, Error)]
pub enum InitError {
    /// A configured rule source does not exist or is not a file.
    #[error("rule source not found: {0}")]
    RuleSourceMissing(String),
    /// The engine builder rejected the config.
    #[error("engine construction failed: {0}")]
    Build(String),
    /// Nobody has called `initialize` yet.
    #[error("inspection engine is not initialized")]
    NotInitialized,
}

/// Shared handle to the constructed engine.
///
/// Records, once at construction, whether the engine exposes the
/// request-scoped transaction factory; requests never re-probe.
pub struct EngineHandle {
    engine: Arc<dyn InspectionEngine>,
    scoped: bool,
}

impl EngineHandle {
    fn probe(engine: Arc<dyn InspectionEngine>) -> Self {
        let scoped = engine.as_scoped().is_some();
        Self { engine, scoped }
    }

    /// Whether transactions are opened through the scoped factory.
    pub fn is_scoped(&self) -> bool {
        self.scoped
    }

    /// Opens one transaction for a request.
    pub fn open_transaction(&self, scope: &RequestScope) -> Box<dyn EngineTransaction> {
        if self.scoped {
            if let Some(scoped) = self.engine.as_scoped() {
                return scoped.new_scoped_transaction(scope);
            }
        }
        self.engine.new_transaction()
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("scoped", &self.scoped)
            .finish_non_exhaustive()
    }
}

/// Process-level gateway state.
pub struct Gateway {
    cell: OnceCell<Result<EngineHandle, InitError>>,
    block_message: RwLock<Option<String>>,
    fallback_status: AtomicU16,
}

impl Gateway {
    /// An uninitialized gateway.
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            block_message: RwLock::new(None),
            fallback_status: AtomicU16::new(403),
        }
    }

    /// Builds the engine if nobody has yet; otherwise reports the recorded
    /// outcome. Concurrent callers all observe the single attempt.
    pub fn initialize(
        &self,
        config: EngineConfig,
        builder: &dyn EngineBuilder,
    ) -> Result<(), InitError> {
        let outcome = self.cell.get_or_init(|| self.construct(config, builder));
        outcome.as_ref().map(|_| ()).map_err(Clone::clone)
    }

    fn construct(
        &self,
        mut config: EngineConfig,
        builder: &dyn EngineBuilder,
    ) -> Result<EngineHandle, InitError> {
        for path in config.resolved_directives() {
            if !path.is_file() {
                let err = InitError::RuleSourceMissing(path.display().to_string());
                error!("Engine initialization failed: {err}");
                return Err(err);
            }
        }

        if config.error_log && config.match_sink.is_none() {
            config.match_sink = Some(tracing_match_sink());
        }

        info!(
            "Initializing inspection engine with {} rule source(s), mode {}",
            config.directives.len(),
            config.rule_engine
        );
        match builder.build(&config) {
            Ok(engine) => {
                let handle = EngineHandle::probe(engine);
                info!(
                    "Inspection engine ready (request-scoped transactions: {})",
                    handle.scoped
                );
                Ok(handle)
            }
            Err(err) => {
                error!("Engine construction failed: {err}");
                Err(InitError::Build(err.to_string()))
            }
        }
    }

    /// The engine handle, or why there is none.
    pub fn engine(&self) -> Result<&EngineHandle, InitError> {
        match self.cell.get() {
            Some(Ok(handle)) => Ok(handle),
            Some(Err(err)) => Err(err.clone()),
            None => Err(InitError::NotInitialized),
        }
    }

    /// Replaces the block message. Empty strings are ignored.
    pub fn set_block_message(&self, message: impl Into<String>) {
        let message = message.into();
        if message.is_empty() {
            return;
        }
        *self.block_message.write() = Some(message);
    }

    /// The message sent to blocked clients.
    pub fn block_message(&self) -> String {
        self.block_message
            .read()
            .clone()
            .unwrap_or_else(|| DEFAULT_BLOCK_MESSAGE.to_owned())
    }

    /// Replaces the status used for non-deny interruptions.
    pub fn set_fallback_status(&self, status: StatusCode) {
        self.fallback_status.store(status.as_u16(), Ordering::Relaxed);
    }

    /// The status used for non-deny interruptions.
    pub fn fallback_status(&self) -> StatusCode {
        StatusCode::from_u16(self.fallback_status.load(Ordering::Relaxed))
            .unwrap_or(StatusCode::FORBIDDEN)
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

/// The default matched-rule logger: severity-mapped `tracing` events.
pub fn tracing_match_sink() -> MatchSink {
    Arc::new(|event: &MatchedRuleEvent| {
        let MatchedRuleEvent {
            severity,
            message,
            rule_id,
        } = event;
        match severity {
            Severity::Emergency | Severity::Alert | Severity::Critical | Severity::Error => {
                error!("Rule {rule_id} matched ({severity}): {message}")
            }
            Severity::Warning => warn!("Rule {rule_id} matched ({severity}): {message}"),
            Severity::Notice | Severity::Info => {
                info!("Rule {rule_id} matched ({severity}): {message}")
            }
            Severity::Debug => debug!("Rule {rule_id} matched: {message}"),
        }
    })
}

/// The process-wide gateway behind the free functions and the middleware.
static GATEWAY: Gateway = Gateway::new();

pub(crate) fn global() -> &'static Gateway {
    &GATEWAY
}

/// Initializes the process-wide engine. First call wins; later calls
/// observe the recorded outcome.
pub fn initialize(config: EngineConfig, builder: &dyn EngineBuilder) -> Result<(), InitError> {
    GATEWAY.initialize(config, builder)
}

/// Initializes the process-wide engine from rule-source paths alone. An
/// empty list means the default config.
pub fn initialize_with_defaults<I, P>(paths: I, builder: &dyn EngineBuilder) -> Result<(), InitError>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
    let config = if paths.is_empty() {
        EngineConfig::default()
    } else {
        EngineConfig::from_files(paths)
    };
    GATEWAY.initialize(config, builder)
}

/// Replaces the process-wide block message. Empty strings are ignored.
pub fn set_block_message(message: impl Into<String>) {
    GATEWAY.set_block_message(message)
}

/// Replaces the process-wide status for non-deny interruptions.
pub fn set_fallback_status(status: StatusCode) {
    GATEWAY.set_fallback_status(status)
}
