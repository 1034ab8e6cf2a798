//! Core identifier types for the threadloom workflow engine.
//!
//! This module defines the fundamental types used throughout the system for
//! identifying nodes and channels in workflow graphs. These are the core
//! domain concepts that define what a workflow *is*.
//!
//! For runtime execution types (thread ids, checkpoint sequences), see
//! [`crate::runtimes`].
//!
//! # Key Types
//!
//! - [`NodeKind`]: Identifies a position in a workflow graph
//! - [`ChannelType`]: Identifies a state channel for reducer registration
//!
//! # Examples
//!
//! ```rust
//! use threadloom::types::{NodeKind, ChannelType};
//!
//! let start = NodeKind::Start;
//! let custom = NodeKind::Custom("classify".to_string());
//! let end = NodeKind::End;
//!
//! // Encode for persistence
//! assert_eq!(custom.encode(), "Custom:classify");
//!
//! let channel = ChannelType::Messages;
//! assert_eq!(channel.as_str(), "messages");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `NodeKind` serves as a unique identifier for nodes in the workflow
/// execution graph. `Start` and `End` are virtual endpoints: they are never
/// executed and must not be registered with
/// [`GraphBuilder::add_node`](crate::graphs::GraphBuilder::add_node). Every
/// run begins at the single node reachable from `Start`, and reaching `End`
/// completes the run.
///
/// # Persistence
///
/// `NodeKind` supports serialization for checkpointing through both serde
/// and the [`encode`](Self::encode)/[`decode`](Self::decode) methods.
///
/// # Examples
///
/// ```rust
/// use threadloom::types::NodeKind;
///
/// let node = NodeKind::Custom("searchDestination".to_string());
/// let encoded = node.encode();
/// assert_eq!(NodeKind::decode(&encoded), node);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Virtual entry point. Exactly one edge must leave it.
    Start,

    /// Virtual terminal. Reaching it completes the run.
    End,

    /// Application node identified by a user-defined string.
    ///
    /// The string should be descriptive and unique within the workflow.
    Custom(String),
}

impl NodeKind {
    /// Encode a NodeKind into its persisted string form.
    ///
    /// The encoding format is human-readable and forward-compatible:
    /// - `Start` → `"Start"`
    /// - `End` → `"End"`
    /// - `Custom("X")` → `"Custom:X"`
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(s) => format!("Custom:{s}"),
        }
    }

    /// Decode a persisted string form back into a NodeKind.
    ///
    /// Unrecognized encodings fall back to `Custom(s)` so checkpoints written
    /// by newer versions still load.
    ///
    /// ```rust
    /// # use threadloom::types::NodeKind;
    /// assert_eq!(NodeKind::decode("Start"), NodeKind::Start);
    /// assert_eq!(NodeKind::decode("Custom:pay"), NodeKind::Custom("pay".to_string()));
    /// assert_eq!(NodeKind::decode("mystery"), NodeKind::Custom("mystery".to_string()));
    /// ```
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeKind::Start
        } else if s == "End" {
            NodeKind::End
        } else if let Some(rest) = s.strip_prefix("Custom:") {
            NodeKind::Custom(rest.to_string())
        } else {
            NodeKind::Custom(s.to_string())
        }
    }

    /// Returns `true` if this is the virtual [`Start`](Self::Start) endpoint.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` if this is the virtual [`End`](Self::End) endpoint.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` if this is an application node.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

// Developer experience: allow string literals where a NodeKind is expected.
impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

/// Identifies a state channel for reducer registration and update reporting.
///
/// Each channel maintains its own reducer and version counter. A partial
/// update naming a channel with no registered reducer fails with
/// [`SchemaError`](crate::reducers::SchemaError).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// Conversation transcript. Reduced by merge-by-id append.
    Messages,

    /// Free-form key/value store for workflow domain data.
    /// Reduced by per-key replacement.
    Extra,

    /// Absorbed fault events. Reduced by append.
    Errors,
}

impl ChannelType {
    /// Stable lowercase label used in update reports and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Extra => "extra",
            Self::Errors => "errors",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
