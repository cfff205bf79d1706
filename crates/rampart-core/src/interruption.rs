//! Interruption values issued by the inspection engine.
//!
//! An interruption is a deliberate policy decision to stop processing a
//! request, not an error. The engine produces at most one per request; the
//! adapter consumes it exactly once when shaping the deny response.

use serde::{Deserialize, Serialize};

/// Verb carried by an interruption.
///
/// Engines use a small action vocabulary; only `Deny` has fully specified
/// status semantics here. Anything the adapter does not recognize arrives as
/// `Other` and is mapped to the configured fallback status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptionAction {
    /// Reject the request with a status code.
    Deny,
    /// Sever the connection without a meaningful response.
    Drop,
    /// Send the client elsewhere.
    Redirect,
    /// Engine-specific verb the adapter treats as policy-defined.
    Other(String),
}

impl InterruptionAction {
    /// Returns the action verb as the engine would spell it.
    pub fn as_str(&self) -> &str {
        match self {
            InterruptionAction::Deny => "deny",
            InterruptionAction::Drop => "drop",
            InterruptionAction::Redirect => "redirect",
            InterruptionAction::Other(verb) => verb,
        }
    }
}

impl std::fmt::Display for InterruptionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An engine decision to stop processing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interruption {
    /// Action verb attached by the matching rule.
    pub action: InterruptionAction,
    /// Explicit status code, when the rule named one.
    pub status: Option<u16>,
    /// Identifier of the rule that fired, when known.
    pub rule_id: Option<u64>,
    /// Free-form metadata the engine wants logged (redirect target,
    /// anomaly summary, and the like).
    pub data: Option<String>,
}

impl Interruption {
    /// Creates an interruption with the given action and nothing else set.
    pub fn new(action: InterruptionAction) -> Self {
        Self {
            action,
            status: None,
            rule_id: None,
            data: None,
        }
    }

    /// Creates a deny interruption with an explicit status code.
    pub fn deny(status: u16) -> Self {
        Self {
            action: InterruptionAction::Deny,
            status: Some(status),
            rule_id: None,
            data: None,
        }
    }

    /// Creates a deny interruption that leaves status selection to the
    /// adapter.
    pub fn deny_default() -> Self {
        Self::new(InterruptionAction::Deny)
    }

    /// Creates a redirect interruption toward `target`.
    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            action: InterruptionAction::Redirect,
            status: Some(302),
            rule_id: None,
            data: Some(target.into()),
        }
    }

    /// Sets the identifier of the rule that fired.
    pub fn with_rule_id(mut self, rule_id: u64) -> Self {
        self.rule_id = Some(rule_id);
        self
    }

    /// Attaches log metadata.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Returns true for an explicit deny.
    pub fn is_deny(&self) -> bool {
        self.action == InterruptionAction::Deny
    }

    /// One-line form used in adapter logs.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("action={}", self.action)];
        if let Some(status) = self.status {
            parts.push(format!("status={}", status));
        }
        if let Some(rule_id) = self.rule_id {
            parts.push(format!("rule_id={}", rule_id));
        }
        if let Some(ref data) = self.data {
            parts.push(format!("data={}", data));
        }
        parts.join(" ")
    }
}
