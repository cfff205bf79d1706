//! Matched-rule events surfaced through the error-log callback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Severity ladder engines attach to matched rules.
///
/// The eight syslog levels, ordered most to least severe, as rule languages
/// conventionally number them (0 = emergency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl Severity {
    /// Returns the conventional lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Emergency => "emergency",
            Severity::Alert => "alert",
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }

    /// Returns the conventional numeric level (0 = emergency, 7 = debug).
    pub fn level(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event describing a rule that fired during evaluation.
///
/// Passed read-only to the configured match sink; the gateway itself keeps
/// nothing beyond the log line it emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRuleEvent {
    /// Severity the rule declared.
    pub severity: Severity,
    /// Human-readable log line the engine assembled for this match.
    pub message: String,
    /// Identifier of the rule that fired.
    pub rule_id: u64,
}

impl MatchedRuleEvent {
    /// Creates an event.
    pub fn new(severity: Severity, message: impl Into<String>, rule_id: u64) -> Self {
        Self {
            severity,
            message: message.into(),
            rule_id,
        }
    }
}

/// Callback invoked whenever the engine's error log fires.
pub type MatchSink = Arc<dyn Fn(&MatchedRuleEvent) + Send + Sync>;
