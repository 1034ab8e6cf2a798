use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ChannelType;

/// A structured runtime event emitted by nodes or the run loop.
///
/// Events are observability data, not control flow: dropping them never
/// changes execution. Nodes emit `Node` events through
/// [`NodeContext::emit`](crate::node::NodeContext::emit); the runner emits
/// `Update` after every barrier merge and `Interrupt` when a thread pauses.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    Node(NodeEvent),
    Update(UpdateEvent),
    Interrupt(InterruptEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    pub fn node_message(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Node(NodeEvent::new(None, None, scope.into(), message.into()))
    }

    pub fn node_message_with_meta(
        node_id: impl Into<String>,
        step: u64,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Event::Node(NodeEvent::new(
            Some(node_id.into()),
            Some(step),
            scope.into(),
            message.into(),
        ))
    }

    /// Barrier report: which channels a node's partial actually changed.
    pub fn update(node_id: impl Into<String>, step: u64, channels: Vec<ChannelType>) -> Self {
        Event::Update(UpdateEvent {
            node_id: node_id.into(),
            step,
            channels,
        })
    }

    /// A thread paused awaiting external input.
    pub fn interrupt(node_id: impl Into<String>, step: u64, action: impl Into<String>) -> Self {
        Event::Interrupt(InterruptEvent {
            node_id: node_id.into(),
            step,
            action: action.into(),
        })
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn scope_label(&self) -> Option<&str> {
        match self {
            Event::Node(node) => Some(node.scope()),
            Event::Update(_) => Some("update"),
            Event::Interrupt(_) => Some("interrupt"),
            Event::Diagnostic(diag) => Some(diag.scope()),
        }
    }

    /// Normalized JSON form for sinks that forward to external consumers.
    pub fn to_json_value(&self) -> Value {
        use serde_json::json;

        let (event_type, metadata, message) = match self {
            Event::Node(node) => {
                let mut meta = serde_json::Map::new();
                if let Some(node_id) = node.node_id() {
                    meta.insert("node_id".to_string(), json!(node_id));
                }
                if let Some(step) = node.step() {
                    meta.insert("step".to_string(), json!(step));
                }
                ("node", Value::Object(meta), node.message().to_string())
            }
            Event::Update(update) => {
                let labels: Vec<&str> = update.channels.iter().map(ChannelType::as_str).collect();
                let meta = json!({
                    "node_id": update.node_id,
                    "step": update.step,
                    "channels": labels,
                });
                ("update", meta, format!("updated {}", labels.join(", ")))
            }
            Event::Interrupt(interrupt) => {
                let meta = json!({
                    "node_id": interrupt.node_id,
                    "step": interrupt.step,
                    "action": interrupt.action,
                });
                (
                    "interrupt",
                    meta,
                    format!("paused awaiting input for {}", interrupt.action),
                )
            }
            Event::Diagnostic(diag) => (
                "diagnostic",
                Value::Object(serde_json::Map::new()),
                diag.message().to_string(),
            ),
        };

        json!({
            "type": event_type,
            "scope": self.scope_label(),
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
            "metadata": metadata,
        })
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Node(node) => match (node.node_id(), node.step()) {
                (Some(id), Some(step)) => write!(f, "[{id}@{step}] {}", node.message()),
                (Some(id), None) => write!(f, "[{id}] {}", node.message()),
                (None, Some(step)) => write!(f, "[step {step}] {}", node.message()),
                (None, None) => write!(f, "{}", node.message()),
            },
            Event::Update(update) => {
                let labels: Vec<&str> = update.channels.iter().map(ChannelType::as_str).collect();
                write!(
                    f,
                    "[{}@{}] updated {}",
                    update.node_id,
                    update.step,
                    labels.join(", ")
                )
            }
            Event::Interrupt(interrupt) => write!(
                f,
                "[{}@{}] interrupted: {}",
                interrupt.node_id, interrupt.step, interrupt.action
            ),
            Event::Diagnostic(diag) => write!(f, "{}", diag.message()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeEvent {
    node_id: Option<String>,
    step: Option<u64>,
    scope: String,
    message: String,
}

impl NodeEvent {
    pub fn new(node_id: Option<String>, step: Option<u64>, scope: String, message: String) -> Self {
        Self {
            node_id,
            step,
            scope,
            message,
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    pub fn step(&self) -> Option<u64> {
        self.step
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Emitted by the runner after each barrier merge.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateEvent {
    pub node_id: String,
    pub step: u64,
    /// Channels whose content actually changed, in fixed channel order.
    pub channels: Vec<ChannelType>,
}

/// Emitted by the runner when a thread pauses on an interrupt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterruptEvent {
    pub node_id: String,
    pub step: u64,
    pub action: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    scope: String,
    message: String,
}

impl DiagnosticEvent {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
