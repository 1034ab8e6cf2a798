use uuid::Uuid;

/// Generates the identifiers used across the crate: thread ids, message
/// ids, and tool-call ids. UUID v4 with a short, greppable prefix per kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Id for a new conversation thread.
    #[must_use]
    pub fn generate_thread_id(&self) -> String {
        format!("thread-{}", Uuid::new_v4())
    }

    /// Id for a new transcript message.
    #[must_use]
    pub fn generate_message_id(&self) -> String {
        format!("msg-{}", Uuid::new_v4())
    }

    /// Id for a new tool call, echoed back by its tool response.
    #[must_use]
    pub fn generate_call_id(&self) -> String {
        format!("call-{}", Uuid::new_v4())
    }
}
