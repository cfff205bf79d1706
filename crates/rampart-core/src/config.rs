//! Engine configuration assembled by the gateway and consumed by an
//! [`EngineBuilder`](crate::engine::EngineBuilder).
//!
//! The config is plain data plus two opaque handles (debug sink, match
//! sink). The gateway validates the rule-source list before handing the
//! config to the builder; everything else is interpreted by the engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::event::MatchSink;

/// Default rule-source location.
pub const DEFAULT_DIRECTIVES_FILE: &str = "./conf/rampart.conf";

/// Default request-body byte limit (10 MiB).
pub const DEFAULT_REQUEST_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Default in-memory threshold for buffered request bodies (128 KiB).
pub const DEFAULT_REQUEST_BODY_IN_MEMORY_LIMIT: usize = 128 * 1024;

/// Default response-body byte limit (512 KiB).
pub const DEFAULT_RESPONSE_BODY_LIMIT: usize = 512 * 1024;

/// Rule-engine evaluation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineMode {
    /// Evaluate rules and enforce interruptions.
    #[default]
    On,
    /// Skip evaluation entirely.
    Off,
    /// Evaluate and log, but never interrupt.
    DetectionOnly,
}

impl EngineMode {
    /// Returns the mode as rule files spell it.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::On => "On",
            EngineMode::Off => "Off",
            EngineMode::DetectionOnly => "DetectionOnly",
        }
    }

    /// Returns true when evaluation is switched off.
    pub fn is_off(&self) -> bool {
        matches!(self, EngineMode::Off)
    }
}

impl std::fmt::Display for EngineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EngineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("on") => Ok(EngineMode::On),
            s if s.eq_ignore_ascii_case("off") => Ok(EngineMode::Off),
            s if s.eq_ignore_ascii_case("detectiononly") => Ok(EngineMode::DetectionOnly),
            other => Err(format!("unknown engine mode: {other}")),
        }
    }
}

/// Sink for the engine's debug log.
pub trait DebugSink: Send + Sync {
    /// Writes one debug line.
    fn write(&self, line: &str);
}

/// Debug sink forwarding to `tracing::debug!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDebugSink;

impl DebugSink for TracingDebugSink {
    fn write(&self, line: &str) {
        tracing::debug!("{}", line);
    }
}

/// Immutable description of engine behavior.
#[derive(Clone)]
pub struct EngineConfig {
    /// Ordered rule-source locations; every entry must exist at
    /// initialization time.
    pub directives: Vec<PathBuf>,
    /// Base directory for resolving relative rule-source paths.
    pub root_dir: Option<PathBuf>,
    /// Rule-engine evaluation mode.
    pub rule_engine: EngineMode,
    /// Whether the engine may buffer and inspect request bodies.
    pub request_body_access: bool,
    /// Request-body byte limit.
    pub request_body_limit: usize,
    /// Bytes of request body kept in memory before spilling.
    pub request_body_in_memory_limit: usize,
    /// Whether the engine may buffer and inspect response bodies.
    pub response_body_access: bool,
    /// Response-body byte limit.
    pub response_body_limit: usize,
    /// Response MIME types eligible for body inspection.
    pub response_body_mime_types: Vec<String>,
    /// Optional debug-log sink handed to the engine.
    pub debug_log: Option<Arc<dyn DebugSink>>,
    /// Whether matched rules should reach the match sink at all.
    pub error_log: bool,
    /// Callback invoked when the engine's error log fires. When left unset
    /// with `error_log` on, the gateway installs its tracing-based logger.
    pub match_sink: Option<MatchSink>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            directives: vec![PathBuf::from(DEFAULT_DIRECTIVES_FILE)],
            root_dir: None,
            rule_engine: EngineMode::On,
            request_body_access: true,
            request_body_limit: DEFAULT_REQUEST_BODY_LIMIT,
            request_body_in_memory_limit: DEFAULT_REQUEST_BODY_IN_MEMORY_LIMIT,
            response_body_access: false,
            response_body_limit: DEFAULT_RESPONSE_BODY_LIMIT,
            response_body_mime_types: vec![
                "text/html".to_string(),
                "text/plain".to_string(),
                "application/json".to_string(),
                "application/xml".to_string(),
            ],
            debug_log: None,
            error_log: true,
            match_sink: None,
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("directives", &self.directives)
            .field("root_dir", &self.root_dir)
            .field("rule_engine", &self.rule_engine)
            .field("request_body_access", &self.request_body_access)
            .field("request_body_limit", &self.request_body_limit)
            .field(
                "request_body_in_memory_limit",
                &self.request_body_in_memory_limit,
            )
            .field("response_body_access", &self.response_body_access)
            .field("response_body_limit", &self.response_body_limit)
            .field("response_body_mime_types", &self.response_body_mime_types)
            .field("debug_log", &self.debug_log.is_some())
            .field("error_log", &self.error_log)
            .field("match_sink", &self.match_sink.is_some())
            .finish()
    }
}

impl EngineConfig {
    /// Creates a config with the given rule sources and default settings.
    pub fn from_files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            directives: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the base directory for relative rule-source paths.
    pub fn with_root_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root.into());
        self
    }

    /// Sets the rule-engine mode.
    pub fn with_rule_engine(mut self, mode: EngineMode) -> Self {
        self.rule_engine = mode;
        self
    }

    /// Toggles request-body inspection.
    pub fn with_request_body_access(mut self, enabled: bool) -> Self {
        self.request_body_access = enabled;
        self
    }

    /// Sets the request-body byte limit.
    pub fn with_request_body_limit(mut self, limit: usize) -> Self {
        self.request_body_limit = limit;
        self
    }

    /// Toggles response-body inspection.
    pub fn with_response_body_access(mut self, enabled: bool) -> Self {
        self.response_body_access = enabled;
        self
    }

    /// Installs a debug-log sink.
    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug_log = Some(sink);
        self
    }

    /// Installs a custom match sink.
    pub fn with_match_sink(mut self, sink: MatchSink) -> Self {
        self.match_sink = Some(sink);
        self
    }

    /// Toggles the error log (and with it, match-sink delivery).
    pub fn with_error_log(mut self, enabled: bool) -> Self {
        self.error_log = enabled;
        self
    }

    /// Returns the rule sources with relative paths resolved against
    /// `root_dir`.
    pub fn resolved_directives(&self) -> Vec<PathBuf> {
        self.directives
            .iter()
            .map(|path| self.resolve(path))
            .collect()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match (&self.root_dir, path.is_relative()) {
            (Some(root), true) => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(
            config.directives,
            vec![PathBuf::from(DEFAULT_DIRECTIVES_FILE)]
        );
        assert_eq!(config.rule_engine, EngineMode::On);
        assert!(config.request_body_access);
        assert_eq!(config.request_body_limit, 10 * 1024 * 1024);
        assert_eq!(config.request_body_in_memory_limit, 128 * 1024);
        assert!(!config.response_body_access);
        assert_eq!(config.response_body_limit, 512 * 1024);
        assert_eq!(config.response_body_mime_types.len(), 4);
        assert!(config.error_log);
        assert!(config.debug_log.is_none());
        assert!(config.match_sink.is_none());
    }

    #[test]
    fn from_files_replaces_only_the_directive_list() {
        let config = EngineConfig::from_files(["a.conf", "b.conf"]);
        assert_eq!(config.directives.len(), 2);
        assert!(config.request_body_access);
    }

    #[test]
    fn resolved_directives_join_relative_paths_onto_root() {
        let config = EngineConfig::from_files(["rules/base.conf", "/etc/waf/extra.conf"])
            .with_root_dir("/srv/gateway");
        let resolved = config.resolved_directives();
        assert_eq!(resolved[0], PathBuf::from("/srv/gateway/rules/base.conf"));
        assert_eq!(resolved[1], PathBuf::from("/etc/waf/extra.conf"));
    }

    #[test]
    fn resolved_directives_without_root_are_untouched() {
        let config = EngineConfig::from_files(["rules/base.conf"]);
        assert_eq!(
            config.resolved_directives(),
            vec![PathBuf::from("rules/base.conf")]
        );
    }

    #[test]
    fn engine_mode_parses_case_insensitively() {
        assert_eq!("on".parse::<EngineMode>().unwrap(), EngineMode::On);
        assert_eq!("OFF".parse::<EngineMode>().unwrap(), EngineMode::Off);
        assert_eq!(
            "DetectionOnly".parse::<EngineMode>().unwrap(),
            EngineMode::DetectionOnly
        );
        assert!("permissive".parse::<EngineMode>().is_err());
    }

    #[test]
    fn engine_mode_off_is_off() {
        assert!(EngineMode::Off.is_off());
        assert!(!EngineMode::DetectionOnly.is_off());
    }

    #[test]
    fn debug_output_hides_the_handles() {
        let config = EngineConfig::default().with_debug_sink(Arc::new(TracingDebugSink));
        let debug = format!("{:?}", config);
        assert!(debug.contains("debug_log: true"));
        assert!(debug.contains("match_sink: false"));
    }
}
