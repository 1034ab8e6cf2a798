//! Node execution framework.
//!
//! This module provides the core abstractions for executable workflow nodes:
//! the [`Node`] trait, the execution context with its interrupt primitive,
//! partial state updates, and error handling.

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::channels::errors::ErrorEvent;
use crate::event_bus::Event;
use crate::interrupts::{InterruptRequest, ResumeQueue, ResumeValue};
use crate::message::Message;
use crate::state::StateSnapshot;

/// Core trait defining an executable workflow node.
///
/// A node is a single async unit of work. It receives an immutable state
/// snapshot and an execution context, performs its work, and returns a
/// partial state update for the barrier to merge.
///
/// # Error handling
///
/// - **Absorbed faults** (external provider failures the conversation can
///   survive): add an [`ErrorEvent`] to `NodePartial.errors` alongside an
///   explanatory assistant message, and return `Ok`.
/// - **Fatal errors**: return `Err(NodeError)` to halt the thread.
/// - **Interrupts**: `ctx.interrupt(request)?` — the `?` turns an
///   unanswered interrupt into the pause signal the run loop recognizes.
///
/// # Examples
///
/// ```rust,no_run
/// use threadloom::node::{Node, NodeContext, NodePartial, NodeError};
/// use threadloom::interrupts::{InterruptRequest, InterruptCapabilities, ResumeValue};
/// use threadloom::message::Message;
/// use threadloom::state::StateSnapshot;
/// use async_trait::async_trait;
///
/// struct ApprovalGate;
///
/// #[async_trait]
/// impl Node for ApprovalGate {
///     async fn run(&self, _: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
///         let request = InterruptRequest::new("send_email")
///             .with_capabilities(InterruptCapabilities::all());
///         let answer = ctx.interrupt(request)?;
///         let note = match answer {
///             ResumeValue::Accept => "email approved",
///             ResumeValue::Ignore => "email discarded",
///             _ => "email revised",
///         };
///         Ok(NodePartial::new().with_messages(vec![Message::assistant(note)]))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this node with the given state snapshot and context.
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError>;
}

/// Execution context passed to a node for one invocation.
///
/// Carries the node's identity, the step counter, the event channel, the
/// run's `configurable` map, and the resume-value queue that backs
/// [`interrupt`](Self::interrupt).
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Display identifier of the executing node.
    pub node_id: String,
    /// Step number this invocation will complete as.
    pub step: u64,
    /// Channel for emitting events to the runner's event bus.
    pub event_bus_sender: flume::Sender<Event>,
    configurable: Arc<FxHashMap<String, Value>>,
    resume: ResumeQueue,
}

impl NodeContext {
    /// Assemble a context. Called by the run loop; tests build contexts the
    /// same way with a fresh [`ResumeQueue`].
    #[must_use]
    pub fn new(
        node_id: String,
        step: u64,
        event_bus_sender: flume::Sender<Event>,
        configurable: Arc<FxHashMap<String, Value>>,
        resume: ResumeQueue,
    ) -> Self {
        Self {
            node_id,
            step,
            event_bus_sender,
            configurable,
            resume,
        }
    }

    /// Look up a run-scoped configuration value (e.g. a terms-acceptance
    /// flag), shared by every node of the thread.
    #[must_use]
    pub fn config(&self, key: &str) -> Option<&Value> {
        self.configurable.get(key)
    }

    /// Emit a node-scoped event enriched with this context's metadata.
    pub fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), NodeContextError> {
        self.event_bus_sender
            .send(Event::node_message_with_meta(
                self.node_id.clone(),
                self.step,
                scope,
                message,
            ))
            .map_err(|_| NodeContextError::EventBusUnavailable)
    }

    /// Request external input for `request`.
    ///
    /// On a resume pass the next queued [`ResumeValue`] answers the request
    /// immediately. Otherwise the request becomes the
    /// [`NodeError::Interrupt`] pause signal; propagate it with `?`.
    ///
    /// The queue is positional: during replay, interrupt calls consume
    /// queued values strictly in order, so a node issuing several interrupts
    /// must issue them deterministically.
    pub fn interrupt(&self, request: InterruptRequest) -> Result<ResumeValue, NodeError> {
        match self.resume.pop() {
            Some(value) => Ok(value),
            None => Err(NodeError::Interrupt(Box::new(request))),
        }
    }
}

/// Partial state update returned by node execution.
///
/// All fields are optional: a node updates only the channels it cares about
/// and untouched channels are preserved verbatim by the barrier.
///
/// # Examples
///
/// ```rust
/// use threadloom::node::NodePartial;
/// use threadloom::message::Message;
/// use threadloom::utils::collections::new_extra_map;
/// use serde_json::json;
///
/// let mut extra = new_extra_map();
/// extra.insert("is_new_trip_request".to_string(), json!(false));
///
/// let partial = NodePartial::new()
///     .with_messages(vec![Message::assistant("Continuing your current trip.")])
///     .with_extra(extra);
/// ```
#[derive(Clone, Debug, Default)]
pub struct NodePartial {
    /// Messages to merge into the transcript.
    pub messages: Option<Vec<Message>>,
    /// Key/value entries to merge into the extra channel.
    pub extra: Option<FxHashMap<String, Value>>,
    /// Absorbed faults to append to the errors channel.
    pub errors: Option<Vec<ErrorEvent>>,
}

impl NodePartial {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the messages delta.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Set the extra delta.
    #[must_use]
    pub fn with_extra(mut self, extra: FxHashMap<String, Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Set the errors delta.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ErrorEvent>) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// Errors that can occur when using NodeContext methods.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeContextError {
    /// Event could not be sent because the event bus is disconnected.
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(threadloom::node::event_bus_unavailable),
        help("The event bus may be disconnected. Check that the runner's listener is alive.")
    )]
    EventBusUnavailable,
}

/// Errors terminating a node invocation.
///
/// `Interrupt` is not a failure: it is the pause signal produced by
/// [`NodeContext::interrupt`] and handled specially by the run loop. All
/// other variants halt the thread. For recoverable faults, use
/// `NodePartial.errors` instead.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// The node requested external input that is not yet available.
    #[error("awaiting external input for action: {}", .0.action)]
    #[diagnostic(
        code(threadloom::node::interrupt),
        help("Resume the thread with a resume value to continue.")
    )]
    Interrupt(Box<InterruptRequest>),

    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(threadloom::node::missing_input),
        help("Check that the previous node produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// External provider or service error the node chose not to absorb.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(threadloom::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(threadloom::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(threadloom::node::validation),
        help("Check input data format and required fields.")
    )]
    ValidationFailed(String),

    /// Event bus communication error.
    #[error("event bus error: {0}")]
    #[diagnostic(code(threadloom::node::event_bus))]
    EventBus(#[from] NodeContextError),
}

impl NodeError {
    /// Returns the interrupt request if this is the pause signal.
    #[must_use]
    pub fn into_interrupt(self) -> Result<InterruptRequest, NodeError> {
        match self {
            NodeError::Interrupt(request) => Ok(*request),
            other => Err(other),
        }
    }
}
