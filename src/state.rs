//! State management for workflow threads.
//!
//! State is organized into three versioned channels:
//! - **messages**: the conversation transcript
//! - **extra**: key/value store for workflow domain data (trip records,
//!   classification flags, intermediate results)
//! - **errors**: absorbed fault events
//!
//! Nodes never mutate state directly. They observe an immutable
//! [`StateSnapshot`] and return a [`NodePartial`](crate::node::NodePartial)
//! that the update barrier merges through the registered reducers.
//!
//! # Examples
//!
//! ```rust
//! use threadloom::state::VersionedState;
//! use threadloom::channels::Channel;
//! use serde_json::json;
//!
//! let mut state = VersionedState::new_with_user_message("Book me a trip to Japan.");
//! state.extra.get_mut().insert("active_trip_index".to_string(), json!(0));
//!
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.messages.len(), 1);
//! assert_eq!(snapshot.extra.get("active_trip_index"), Some(&json!(0)));
//!
//! // Snapshots are deep clones, independent of later mutation.
//! state.extra.get_mut().clear();
//! assert_eq!(snapshot.extra.len(), 1);
//! ```

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::{
    channels::{errors::ErrorEvent, Channel, ErrorsChannel, ExtrasChannel, MessagesChannel},
    message::{Message, Role},
};

/// The state container for one workflow thread.
///
/// Each channel maintains its own version number; versions bump only when a
/// barrier actually changed channel content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedState {
    /// Conversation transcript.
    pub messages: MessagesChannel,
    /// Workflow domain data and intermediate results.
    pub extra: ExtrasChannel,
    /// Absorbed fault events.
    pub errors: ErrorsChannel,
}

/// Immutable snapshot of thread state at a specific point in time.
///
/// Snapshots are created by [`VersionedState::snapshot`] and handed to nodes
/// and routers. They contain cloned data, so retained snapshots are never
/// affected by subsequent barrier merges.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Messages at the time of snapshot.
    pub messages: Vec<Message>,
    /// Version of the messages channel when the snapshot was taken.
    pub messages_version: u32,
    /// Extra data at the time of snapshot.
    pub extra: FxHashMap<String, Value>,
    /// Version of the extra channel when the snapshot was taken.
    pub extra_version: u32,
    /// Error events at the time of snapshot.
    pub errors: Vec<ErrorEvent>,
    /// Version of the errors channel when the snapshot was taken.
    pub errors_version: u32,
}

impl VersionedState {
    /// Creates state initialized with a single user message.
    ///
    /// This is the usual entry point for starting a thread: one user turn in
    /// the messages channel, empty extra and errors channels, all versions 1.
    pub fn new_with_user_message(user_text: &str) -> Self {
        Self::new_with_messages(vec![Message::with_role(Role::User, user_text)])
    }

    /// Creates state initialized with an existing transcript.
    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: MessagesChannel::new(messages, 1),
            extra: ExtrasChannel::default(),
            errors: ErrorsChannel::default(),
        }
    }

    /// Creates a builder for constructing state with a fluent API.
    ///
    /// ```rust
    /// use threadloom::state::VersionedState;
    /// use serde_json::json;
    ///
    /// let state = VersionedState::builder()
    ///     .with_system_message("You are a travel planning assistant.")
    ///     .with_user_message("I want to visit Canada this summer.")
    ///     .with_extra("is_new_trip_request", json!(true))
    ///     .build();
    ///
    /// let snapshot = state.snapshot();
    /// assert_eq!(snapshot.messages.len(), 2);
    /// assert_eq!(snapshot.extra.len(), 1);
    /// ```
    pub fn builder() -> VersionedStateBuilder {
        VersionedStateBuilder::default()
    }

    /// Appends a message without bumping the channel version.
    ///
    /// Version accounting belongs to the update barrier; this helper is for
    /// seeding and test setup.
    pub fn add_message(&mut self, message: Message) -> &mut Self {
        self.messages.get_mut().push(message);
        self
    }

    /// Inserts an extra entry without bumping the channel version.
    pub fn add_extra(&mut self, key: &str, value: Value) -> &mut Self {
        self.extra.get_mut().insert(key.to_string(), value);
        self
    }

    /// Creates an immutable snapshot of the current state.
    ///
    /// Clones all channel data, so complexity is linear in state size.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            messages: self.messages.snapshot(),
            messages_version: self.messages.version(),
            extra: self.extra.snapshot(),
            extra_version: self.extra.version(),
            errors: self.errors.snapshot(),
            errors_version: self.errors.version(),
        }
    }
}

/// Builder for [`VersionedState`].
#[derive(Debug, Default)]
pub struct VersionedStateBuilder {
    messages: Vec<Message>,
    extra: FxHashMap<String, Value>,
}

impl VersionedStateBuilder {
    /// Adds a user message.
    pub fn with_user_message(mut self, content: &str) -> Self {
        self.messages.push(Message::with_role(Role::User, content));
        self
    }

    /// Adds an assistant message.
    pub fn with_assistant_message(mut self, content: &str) -> Self {
        self.messages
            .push(Message::with_role(Role::Assistant, content));
        self
    }

    /// Adds a system message.
    pub fn with_system_message(mut self, content: &str) -> Self {
        self.messages
            .push(Message::with_role(Role::System, content));
        self
    }

    /// Adds a prebuilt message (e.g. one carrying tool calls).
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Adds an extra entry.
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Builds the final state with all channels at version 1.
    pub fn build(self) -> VersionedState {
        VersionedState {
            messages: MessagesChannel::new(self.messages, 1),
            extra: ExtrasChannel::new(self.extra, 1),
            errors: ErrorsChannel::default(),
        }
    }
}
