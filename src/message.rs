//! Conversation messages exchanged between workflow nodes.
//!
//! Messages are the primary data structure for representing chat
//! interactions. Each message carries a unique id, a role, content that is
//! either plain text or a sequence of parts, and optionally tool-call
//! requests or a tool response bound to a specific call id.
//!
//! # Tool-call completeness
//!
//! Every tool-call request an assistant message carries must eventually
//! receive exactly one tool response with the same call id before the
//! transcript is complete for model submission.
//! [`Message::find_dangling_tool_calls`] exposes the check.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::id_generator::IdGenerator;

/// Prefix for message ids that downstream renderers should not display.
///
/// Applied by [`Message::hidden_tool_response`] so synthetic tool responses
/// (form submissions, confirmations) complete the transcript without showing
/// up in a chat UI.
pub const DO_NOT_RENDER_ID_PREFIX: &str = "escape-rendering-";

/// The sender role of a [`Message`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human input.
    User,
    /// Model output, possibly carrying tool-call requests.
    Assistant,
    /// Prompt or instruction.
    System,
    /// Response to a tool-call request, bound by call id.
    Tool,
    /// Reducer directive: delete the message with the same id.
    /// Never persisted to a transcript.
    Remove,
}

impl Role {
    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
            Role::Remove => "remove",
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "assistant" => Role::Assistant,
            "system" => Role::System,
            "tool" => Role::Tool,
            "remove" => Role::Remove,
            _ => Role::User,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message body: plain text or a mixed sequence of parts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content.
    Text(String),
    /// Mixed content parts (text and images).
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenated text of the content, ignoring non-text parts.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

/// One element of a mixed-content message body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text fragment.
    Text { text: String },
    /// Image reference by URL.
    Image { url: String },
}

/// A tool invocation requested by an assistant message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call id; the eventual tool response must carry the same id.
    pub id: String,
    /// Tool name the workflow router dispatches on.
    pub name: String,
    /// JSON arguments for the tool.
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    /// Create a tool call with a generated call id.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            id: IdGenerator::new().generate_call_id(),
            name: name.into(),
            args,
        }
    }
}

/// A message in a conversation.
///
/// # Examples
///
/// ```
/// use threadloom::message::Message;
///
/// let user_msg = Message::user("I want to travel to Egypt.");
/// let assistant_msg = Message::assistant("Searching destinations...");
/// assert_eq!(user_msg.text(), "I want to travel to Egypt.");
/// assert_ne!(user_msg.id, assistant_msg.id);
/// ```
///
/// Tool calls and responses are paired by call id:
///
/// ```
/// use threadloom::message::{Message, ToolCall};
/// use serde_json::json;
///
/// let call = ToolCall::new("select_hotel", json!({"hotel_id": 3}));
/// let call_id = call.id.clone();
/// let request = Message::assistant("Pick a hotel").with_tool_calls(vec![call]);
///
/// let pending = [request.clone()];
/// let dangling = Message::find_dangling_tool_calls(&pending);
/// assert_eq!(dangling.len(), 1);
///
/// let response = Message::tool_response(&call_id, "hotel selected");
/// assert!(Message::find_dangling_tool_calls(&[request, response]).is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id (uuid v4 unless explicitly set).
    pub id: String,
    /// The role of the message sender.
    pub role: Role,
    /// Message body.
    #[serde(default)]
    pub content: MessageContent,
    /// Tool invocations requested by this (assistant) message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For `Role::Tool` messages: the call id this message responds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a new message with the specified role and text content.
    #[must_use]
    pub fn with_role(role: Role, content: &str) -> Self {
        Self {
            id: IdGenerator::new().generate_message_id(),
            role,
            content: MessageContent::Text(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Creates a tool response bound to a call id.
    #[must_use]
    pub fn tool_response(call_id: &str, content: &str) -> Self {
        Self {
            id: IdGenerator::new().generate_message_id(),
            role: Role::Tool,
            content: MessageContent::Text(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.to_string()),
        }
    }

    /// Creates a tool response whose id carries [`DO_NOT_RENDER_ID_PREFIX`]
    /// so chat UIs skip it while the transcript stays complete.
    #[must_use]
    pub fn hidden_tool_response(call_id: &str, content: &str) -> Self {
        let mut msg = Self::tool_response(call_id, content);
        msg.id = format!("{DO_NOT_RENDER_ID_PREFIX}{}", msg.id);
        msg
    }

    /// Creates a removal directive for the message with the given id.
    ///
    /// Consumed by the messages reducer; never appended to a transcript.
    #[must_use]
    pub fn remove(id: &str) -> Self {
        Self {
            id: id.to_string(),
            role: Role::Remove,
            content: MessageContent::default(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Attaches tool-call requests to this message.
    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Replaces the generated id.
    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Plain-text view of the content.
    #[must_use]
    pub fn text(&self) -> String {
        self.content.as_text()
    }

    /// Returns `true` if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// Returns `true` if this message carries tool-call requests.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The most recent assistant message carrying tool calls, if any.
    ///
    /// Routers use this to dispatch on the pending tool-call name.
    #[must_use]
    pub fn last_assistant_with_tool_calls(messages: &[Message]) -> Option<&Message> {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && m.has_tool_calls())
    }

    /// Tool calls in `messages` that have not yet received a response.
    ///
    /// A call is satisfied by exactly one later `Role::Tool` message whose
    /// `tool_call_id` matches the call id.
    #[must_use]
    pub fn find_dangling_tool_calls(messages: &[Message]) -> Vec<&ToolCall> {
        let responded: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        messages
            .iter()
            .flat_map(|m| m.tool_calls.iter())
            .filter(|call| !responded.contains(&call.id.as_str()))
            .collect()
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::with_role(Role::User, "")
    }
}
