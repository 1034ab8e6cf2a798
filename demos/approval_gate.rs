//! Human-in-the-loop approval gate demo.
//!
//! A draft/review/send pipeline where the review step pauses the thread and
//! waits for a decision. Shows all four resume kinds plus force-termination
//! with `Command::goto_end()`.
//!
//! Run with: `cargo run --example approval_gate`

use async_trait::async_trait;
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use threadloom::app::App;
use threadloom::control::Command;
use threadloom::graphs::GraphBuilder;
use threadloom::interrupts::{InterruptCapabilities, InterruptRequest, ResumeValue};
use threadloom::message::Message;
use threadloom::node::{Node, NodeContext, NodeError, NodePartial};
use threadloom::runtimes::{CheckpointerType, RunOutcome, ThreadRunner};
use threadloom::state::{StateSnapshot, VersionedState};
use threadloom::types::NodeKind;

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

/// Drafts the notification from the user's request.
struct DraftNode;

#[async_trait]
impl Node for DraftNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let request = snapshot
            .messages
            .first()
            .map(|m| m.text())
            .unwrap_or_default();
        ctx.emit("draft", "drafting notification")?;
        let draft = format!("Draft notification: \"{request}\"");
        Ok(NodePartial::new().with_messages(vec![Message::assistant(&draft)]))
    }
}

/// Pauses for review of the drafted notification.
struct ReviewGateNode;

#[async_trait]
impl Node for ReviewGateNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let draft = snapshot
            .messages
            .last()
            .map(|m| m.text())
            .unwrap_or_default();
        let request = InterruptRequest::new("send_notification")
            .with_arg("draft", json!(draft))
            .with_description("Review the notification before it is sent.")
            .with_capabilities(InterruptCapabilities::all());

        let note = match ctx.interrupt(request)? {
            ResumeValue::Accept => "Reviewer approved the draft.".to_string(),
            ResumeValue::Edit { args } => {
                format!("Reviewer edited the draft: {}", json!(args))
            }
            ResumeValue::Response { text } => format!("Reviewer commented: {text}"),
            ResumeValue::Ignore => "Reviewer declined; nothing will be sent.".to_string(),
        };
        Ok(NodePartial::new().with_messages(vec![Message::assistant(&note)]))
    }
}

/// Sends the approved notification.
struct SendNode;

#[async_trait]
impl Node for SendNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        ctx.emit("send", "notification dispatched")?;
        Ok(NodePartial::new().with_messages(vec![Message::assistant("Notification sent.")]))
    }
}

fn gate_app() -> Result<App> {
    GraphBuilder::new()
        .add_node(custom("draft"), DraftNode)
        .add_node(custom("review"), ReviewGateNode)
        .add_node(custom("send"), SendNode)
        .add_edge(NodeKind::Start, custom("draft"))
        .add_edge(custom("draft"), custom("review"))
        .add_edge(custom("review"), custom("send"))
        .add_edge(custom("send"), NodeKind::End)
        .compile()
        .into_diagnostic()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,threadloom=info"))
        .expect("default filter is valid");
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

async fn paused_thread(runner: &mut ThreadRunner, thread_id: &str) -> Result<()> {
    runner
        .create_thread(
            thread_id.to_string(),
            VersionedState::new_with_user_message("Remind the team about Friday's retro"),
        )
        .await?;
    match runner.run(thread_id).await? {
        RunOutcome::Interrupted { request, .. } => {
            info!(thread = thread_id, action = %request.action, "paused for review");
        }
        _ => info!(thread = thread_id, "thread did not pause"),
    }
    Ok(())
}

fn print_last(state: &VersionedState) {
    if let Some(msg) = state.messages.get().last() {
        info!("  final message: {}", msg.text());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    miette::set_panic_hook();

    let mut runner = ThreadRunner::with_options(gate_app()?, CheckpointerType::InMemory, true).await;

    // Accept: the notification goes out.
    paused_thread(&mut runner, "accept").await?;
    if let RunOutcome::Completed(state) = runner
        .resume("accept", Command::resume(ResumeValue::Accept))
        .await?
    {
        print_last(&state);
    }

    // Edit: the reviewer adjusts the draft before it is sent.
    paused_thread(&mut runner, "edit").await?;
    let mut args = rustc_hash::FxHashMap::default();
    args.insert("subject".to_string(), json!("Retro moved to 3pm"));
    if let RunOutcome::Completed(state) = runner
        .resume("edit", Command::resume(ResumeValue::Edit { args }))
        .await?
    {
        print_last(&state);
    }

    // Ignore: the draft is dropped but the workflow still finishes cleanly.
    paused_thread(&mut runner, "ignore").await?;
    if let RunOutcome::Completed(state) = runner
        .resume("ignore", Command::resume(ResumeValue::Ignore))
        .await?
    {
        print_last(&state);
    }

    // Goto End: abandon the paused thread without answering the interrupt.
    paused_thread(&mut runner, "abandon").await?;
    if let RunOutcome::Completed(state) = runner.resume("abandon", Command::goto_end()).await? {
        print_last(&state);
        info!("  thread force-terminated; the gate never contributed");
    }

    Ok(())
}
