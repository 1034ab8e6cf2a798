//! Human-in-the-loop interrupt and resume protocol.
//!
//! A node suspends its thread by calling
//! [`NodeContext::interrupt`](crate::node::NodeContext::interrupt) with an
//! [`InterruptRequest`] describing the action awaiting review. The run loop
//! checkpoints the thread and surfaces the request to the caller; the caller
//! later resumes with a [`ResumeValue`].
//!
//! # Replay semantics
//!
//! Resuming re-runs the paused node from the top of its body. Queued resume
//! values satisfy its interrupt calls in order; an interrupt call with no
//! queued value left pauses the thread again. A satisfied interrupt is
//! therefore never re-surfaced: its answer is consumed from the queue during
//! replay. Nodes must keep any side effects before their interrupt calls
//! idempotent.
//!
//! Protocol violations (resuming a thread with no pending interrupt, or a
//! malformed resume payload) are fatal [`ProtocolError`]s, not absorbed
//! faults.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What kinds of response the interrupted action accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InterruptCapabilities {
    #[serde(default)]
    pub allow_accept: bool,
    #[serde(default)]
    pub allow_edit: bool,
    #[serde(default)]
    pub allow_respond: bool,
    #[serde(default)]
    pub allow_ignore: bool,
}

impl InterruptCapabilities {
    /// All four response kinds permitted.
    #[must_use]
    pub fn all() -> Self {
        Self {
            allow_accept: true,
            allow_edit: true,
            allow_respond: true,
            allow_ignore: true,
        }
    }

    /// Accept or edit only (e.g. a payment confirmation).
    #[must_use]
    pub fn accept_or_edit() -> Self {
        Self {
            allow_accept: true,
            allow_edit: true,
            ..Self::default()
        }
    }
}

/// A request for external (human) input, surfaced when a thread pauses.
///
/// # Examples
///
/// ```
/// use threadloom::interrupts::{InterruptRequest, InterruptCapabilities};
/// use serde_json::json;
///
/// let request = InterruptRequest::new("send_notification")
///     .with_arg("employee", json!("casey@example.com"))
///     .with_description("Review the notification before it is sent.")
///     .with_capabilities(InterruptCapabilities::all());
/// assert_eq!(request.action, "send_notification");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterruptRequest {
    /// Action label the reviewer sees.
    pub action: String,
    /// Named arguments of the proposed action.
    #[serde(default)]
    pub args: FxHashMap<String, Value>,
    /// Optional free-form description for the reviewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Which response kinds the action accepts.
    #[serde(default)]
    pub capabilities: InterruptCapabilities,
}

impl InterruptRequest {
    /// Creates a request with the given action label and no arguments.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            args: FxHashMap::default(),
            description: None,
            capabilities: InterruptCapabilities::default(),
        }
    }

    /// Adds one named argument.
    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    /// Sets the reviewer-facing description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the capability mask.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: InterruptCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// The external answer to an [`InterruptRequest`].
///
/// Serialized with a lowercase `type` tag:
///
/// ```
/// use threadloom::interrupts::ResumeValue;
/// use serde_json::json;
///
/// let v = ResumeValue::from_json(json!({"type": "response", "text": "use the other hotel"}))
///     .unwrap();
/// assert!(matches!(v, ResumeValue::Response { .. }));
///
/// assert!(ResumeValue::from_json(json!({"type": "approve"})).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResumeValue {
    /// Proceed with the action as proposed.
    Accept,
    /// Proceed with edited arguments.
    Edit { args: FxHashMap<String, Value> },
    /// Free-text feedback instead of a decision.
    Response { text: String },
    /// Decline the action.
    Ignore,
}

impl ResumeValue {
    /// Shorthand for a text response.
    #[must_use]
    pub fn response(text: impl Into<String>) -> Self {
        ResumeValue::Response { text: text.into() }
    }

    /// Parse a resume payload, mapping failures to the fatal protocol error.
    pub fn from_json(value: Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(value).map_err(|e| ProtocolError::MalformedResume {
            detail: e.to_string(),
        })
    }
}

/// Fatal violations of the interrupt/resume protocol.
#[derive(Debug, Error, Diagnostic)]
pub enum ProtocolError {
    /// A resume command arrived for a thread with no pending interrupt.
    #[error("thread {thread_id} has no pending interrupt to resume")]
    #[diagnostic(
        code(threadloom::interrupts::resume_without_interrupt),
        help("Run the thread first; resume is only valid while it is paused on an interrupt.")
    )]
    ResumeWithoutInterrupt { thread_id: String },

    /// A resume payload did not match any known response shape.
    #[error("malformed resume value: {detail}")]
    #[diagnostic(
        code(threadloom::interrupts::malformed_resume),
        help("Expected a JSON object tagged with type accept, edit, response, or ignore.")
    )]
    MalformedResume { detail: String },

    /// A goto command targeted anything other than the End node.
    #[error("goto command only supports the End node, got {target}")]
    #[diagnostic(code(threadloom::interrupts::unsupported_goto))]
    UnsupportedGoto { target: String },
}

/// Ordered queue of resume values consumed during replay of a paused node.
///
/// Cloned into each [`NodeContext`](crate::node::NodeContext); the run loop
/// drains leftovers when the node completes.
#[derive(Clone, Debug, Default)]
pub struct ResumeQueue {
    inner: Arc<Mutex<VecDeque<ResumeValue>>>,
}

impl ResumeQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue preloaded with values, consumed front to back.
    #[must_use]
    pub fn preloaded(values: Vec<ResumeValue>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(values.into())),
        }
    }

    /// Consume the next queued value, if any.
    pub fn pop(&self) -> Option<ResumeValue> {
        self.inner.lock().expect("resume queue poisoned").pop_front()
    }

    /// Discard all remaining values.
    pub fn clear(&self) {
        self.inner.lock().expect("resume queue poisoned").clear();
    }

    /// Whether any values remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("resume queue poisoned").is_empty()
    }
}
