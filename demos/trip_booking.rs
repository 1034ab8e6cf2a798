//! Trip booking workflow demo.
//!
//! A conversational booking flow: a classifier routes each turn either to
//! destination search (new trip) or to the node matching the pending
//! tool call, and the payment step pauses the thread for confirmation
//! before the booking is placed.
//!
//! Run with: `cargo run --example trip_booking`

use async_trait::async_trait;
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use threadloom::app::App;
use threadloom::control::Command;
use threadloom::graphs::{GraphBuilder, Router};
use threadloom::interrupts::{InterruptCapabilities, InterruptRequest, ResumeValue};
use threadloom::message::{Message, Role, ToolCall};
use threadloom::node::{Node, NodeContext, NodeError, NodePartial};
use threadloom::runtimes::{CheckpointerType, RunOutcome, ThreadRunner};
use threadloom::state::{StateSnapshot, VersionedState};
use threadloom::types::NodeKind;
use threadloom::utils::collections::new_extra_map;

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

/// Decides whether this turn opens a new trip request.
struct ClassifyTripNode;

#[async_trait]
impl Node for ClassifyTripNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let is_new = !snapshot.messages.iter().any(|m| m.has_role(Role::Assistant));
        ctx.emit("classify", format!("new trip request: {is_new}"))?;
        let mut extra = new_extra_map();
        extra.insert("is_new_trip_request".to_string(), json!(is_new));
        Ok(NodePartial::new().with_extra(extra))
    }
}

/// Opens the hotel search form for the requested destination.
struct SearchDestinationNode;

#[async_trait]
impl Node for SearchDestinationNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let msg = Message::assistant("Egypt sounds wonderful! Tell me your dates and budget.")
            .with_tool_calls(vec![ToolCall::new(
                "submit_hotel_form",
                json!({"destination": "Cairo"}),
            )]);
        Ok(NodePartial::new().with_messages(vec![msg]))
    }
}

/// Payment gate: pauses the thread until the traveler confirms the charge.
struct PayStripeNode;

#[async_trait]
impl Node for PayStripeNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let call = Message::find_dangling_tool_calls(&snapshot.messages)
            .into_iter()
            .next()
            .ok_or(NodeError::MissingInput {
                what: "pending stripe_payment tool call",
            })?;
        let call_id = call.id.clone();
        let amount = call.args.get("amount").cloned().unwrap_or(json!(0));

        let request = InterruptRequest::new("stripe_payment")
            .with_arg("amount", amount)
            .with_description("Confirm the charge before the booking is placed.")
            .with_capabilities(InterruptCapabilities::all());
        let answer = ctx.interrupt(request)?;

        let status = match answer {
            ResumeValue::Accept | ResumeValue::Edit { .. } => "confirmed",
            ResumeValue::Ignore | ResumeValue::Response { .. } => "canceled",
        };
        let mut extra = new_extra_map();
        extra.insert("booking_confirmed_or_canceled".to_string(), json!(true));
        extra.insert("booking_status".to_string(), json!(status));
        Ok(NodePartial::new()
            .with_messages(vec![Message::hidden_tool_response(&call_id, status)])
            .with_extra(extra))
    }
}

/// Closes the turn with a recap of the payment decision.
struct SummarizeTripNode;

#[async_trait]
impl Node for SummarizeTripNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let confirmed = snapshot.extra.get("booking_status") == Some(&json!("confirmed"));
        let text = if confirmed {
            "Your trip is booked. Safe travels!"
        } else {
            "Booking canceled. Your trip details are saved if you change your mind."
        };
        Ok(NodePartial::new().with_messages(vec![Message::assistant(text)]))
    }
}

fn classify_router() -> Router {
    Arc::new(|snapshot| {
        if snapshot.extra.get("is_new_trip_request") == Some(&json!(true)) {
            return custom("searchDestination");
        }
        match Message::last_assistant_with_tool_calls(&snapshot.messages)
            .and_then(|m| m.tool_calls.first())
            .map(|call| call.name.as_str())
        {
            Some("stripe_processing" | "stripe_payment") => custom("payStripe"),
            _ => NodeKind::End,
        }
    })
}

fn pay_router() -> Router {
    Arc::new(|snapshot| {
        if snapshot.extra.get("booking_confirmed_or_canceled") == Some(&json!(true)) {
            custom("summarizeTrip")
        } else {
            NodeKind::End
        }
    })
}

fn booking_app() -> Result<App> {
    GraphBuilder::new()
        .add_node(custom("classifyTrip"), ClassifyTripNode)
        .add_node(custom("searchDestination"), SearchDestinationNode)
        .add_node(custom("payStripe"), PayStripeNode)
        .add_node(custom("summarizeTrip"), SummarizeTripNode)
        .add_edge(NodeKind::Start, custom("classifyTrip"))
        .add_conditional_edge(
            custom("classifyTrip"),
            classify_router(),
            vec![custom("searchDestination"), custom("payStripe"), NodeKind::End],
        )
        .add_edge(custom("searchDestination"), NodeKind::End)
        .add_conditional_edge(
            custom("payStripe"),
            pay_router(),
            vec![custom("summarizeTrip"), NodeKind::End],
        )
        .add_edge(custom("summarizeTrip"), NodeKind::End)
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

fn print_transcript(state: &VersionedState) {
    for msg in state.messages.get() {
        info!("  [{}] {}", msg.role, msg.text());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    miette::set_panic_hook();

    let app = booking_app()?;
    let mut runner = ThreadRunner::with_options(app, CheckpointerType::InMemory, true).await;

    // Turn 1: a fresh trip request routes to destination search.
    info!("--- turn 1: new trip request ---");
    runner
        .create_thread(
            "trip-1".to_string(),
            VersionedState::new_with_user_message("I want to visit Egypt"),
        )
        .await?;
    if let RunOutcome::Completed(state) = runner.run("trip-1").await? {
        print_transcript(&state);
    }

    // Turn 2: a pending payment tool call routes to the payment gate, which
    // pauses the thread until the traveler confirms.
    info!("--- turn 2: payment confirmation ---");
    let pay_request = Message::assistant("Nile View for 7 nights is $420. Ready to pay?")
        .with_tool_calls(vec![ToolCall::new("stripe_payment", json!({"amount": 420}))]);
    runner
        .create_thread(
            "trip-2".to_string(),
            VersionedState::new_with_messages(vec![
                Message::user("book the Nile View"),
                pay_request,
                Message::user("yes go ahead"),
            ]),
        )
        .await?;

    match runner.run("trip-2").await? {
        RunOutcome::Interrupted { request, .. } => {
            info!(
                "paused: {} (amount {})",
                request.action,
                request.args.get("amount").cloned().unwrap_or(json!(null))
            );
            // The traveler approves; the gate replays and the trip is summarized.
            if let RunOutcome::Completed(state) = runner
                .resume("trip-2", Command::resume(ResumeValue::Accept))
                .await?
            {
                print_transcript(&state);
            }
        }
        RunOutcome::Completed(state) | RunOutcome::Stopped(state) => print_transcript(&state),
    }

    Ok(())
}
