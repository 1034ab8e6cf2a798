//! Absorbed fault events stored on the `errors` channel.
//!
//! Nodes absorb external faults by convention: a failed hotel-search call or
//! payment request becomes an [`ErrorEvent`] in the returned partial (plus an
//! explanatory assistant message) instead of aborting the run. Fatal
//! conditions use error types from [`crate::node`] and
//! [`crate::runtimes`] instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An absorbed fault with scope, cause chain, tags, and free-form context.
///
/// # JSON shape
///
/// ```json
/// {
///   "when": "2026-08-25T10:30:00Z",
///   "scope": { "scope": "node", "kind": "Custom:payStripe", "step": 4 },
///   "error": {
///     "message": "payment provider unavailable",
///     "cause": null,
///     "details": {"status": 503}
///   },
///   "tags": ["provider", "retryable"],
///   "context": {"trip_id": "trip-2"}
/// }
/// ```
///
/// # Examples
///
/// ```
/// use threadloom::channels::errors::{ErrorEvent, FaultDetail};
/// use serde_json::json;
///
/// let event = ErrorEvent::node("payStripe", 4, FaultDetail::msg("payment declined"))
///     .with_tag("provider")
///     .with_context(json!({"trip_id": "trip-2"}));
/// let _json = serde_json::to_string(&event).unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ErrorEvent {
    #[serde(default = "chrono::Utc::now")]
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub scope: ErrorScope,
    #[serde(default)]
    pub error: FaultDetail,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl ErrorEvent {
    /// Create a node-scoped error event.
    pub fn node<S: Into<String>>(kind: S, step: u64, error: FaultDetail) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Node {
                kind: kind.into(),
                step,
            },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Create a runner-scoped error event.
    pub fn runner<S: Into<String>>(thread: S, step: u64, error: FaultDetail) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Runner {
                thread: thread.into(),
                step,
            },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Create an app-scoped error event.
    pub fn app(error: FaultDetail) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::App,
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    /// Add a single tag.
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Replace all tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Attach context metadata.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

/// Where in the system a fault was absorbed.
///
/// Tagged union with a discriminator field named `"scope"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ErrorScope {
    Node {
        /// Encoded `NodeKind` of the faulting node.
        kind: String,
        step: u64,
    },
    Runner {
        thread: String,
        step: u64,
    },
    #[default]
    App,
}

/// Message plus optional cause chain and structured details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaultDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<FaultDetail>>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl Default for FaultDetail {
    fn default() -> Self {
        FaultDetail {
            message: String::new(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }
}

impl std::fmt::Display for FaultDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FaultDetail {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c as &dyn std::error::Error)
    }
}

impl FaultDetail {
    /// Shorthand for a detail with only a message.
    pub fn msg<M: Into<String>>(m: M) -> Self {
        FaultDetail {
            message: m.into(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Attach a cause.
    pub fn with_cause(mut self, cause: FaultDetail) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}
