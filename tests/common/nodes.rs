use async_trait::async_trait;
use serde_json::Value;
use threadloom::interrupts::{InterruptCapabilities, InterruptRequest, ResumeValue};
use threadloom::message::Message;
use threadloom::node::{Node, NodeContext, NodeError, NodePartial};
use threadloom::state::StateSnapshot;
use threadloom::utils::collections::new_extra_map;

#[derive(Debug, Clone)]
pub struct SimpleMessageNode {
    pub msg: &'static str,
}

impl SimpleMessageNode {
    pub fn new(msg: &'static str) -> Self {
        Self { msg }
    }
}

#[async_trait]
impl Node for SimpleMessageNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_messages(vec![Message::assistant(self.msg)]))
    }
}

#[derive(Debug, Clone)]
pub struct NoopNode;

#[async_trait]
impl Node for NoopNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::default())
    }
}

/// Writes one key into the extra channel.
#[derive(Debug, Clone)]
pub struct ExtraWriterNode {
    pub key: &'static str,
    pub value: Value,
}

impl ExtraWriterNode {
    pub fn new(key: &'static str, value: Value) -> Self {
        Self { key, value }
    }
}

#[async_trait]
impl Node for ExtraWriterNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let mut extra = new_extra_map();
        extra.insert(self.key.to_string(), self.value.clone());
        Ok(NodePartial::new().with_extra(extra))
    }
}

/// Pauses the thread for approval of a named action, then records how the
/// reviewer answered.
#[derive(Debug, Clone)]
pub struct GateNode {
    pub action: &'static str,
}

impl GateNode {
    pub fn new(action: &'static str) -> Self {
        Self { action }
    }
}

#[async_trait]
impl Node for GateNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let request =
            InterruptRequest::new(self.action).with_capabilities(InterruptCapabilities::all());
        let answer = ctx.interrupt(request)?;
        let note = match answer {
            ResumeValue::Accept => format!("{} approved", self.action),
            ResumeValue::Ignore => format!("{} declined", self.action),
            ResumeValue::Edit { .. } => format!("{} approved with edits", self.action),
            ResumeValue::Response { text } => format!("{}: reviewer said {text}", self.action),
        };
        Ok(NodePartial::new().with_messages(vec![Message::assistant(&note)]))
    }
}

/// Issues two interrupts in order; used to exercise multi-value resume.
#[derive(Debug, Clone)]
pub struct DoubleGateNode;

#[async_trait]
impl Node for DoubleGateNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let first = ctx.interrupt(InterruptRequest::new("first_check"))?;
        let second = ctx.interrupt(InterruptRequest::new("second_check"))?;
        let note = format!("answers: {first:?} then {second:?}");
        Ok(NodePartial::new().with_messages(vec![Message::assistant(&note)]))
    }
}

/// Always fails with a fatal validation error.
#[derive(Debug, Clone)]
pub struct FailingNode;

#[async_trait]
impl Node for FailingNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Err(NodeError::ValidationFailed("synthetic failure".to_string()))
    }
}
