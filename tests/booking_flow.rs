//! End-to-end workflow exercising conditional tool-call dispatch and a
//! payment approval gate, modeled as one turn of a trip-booking agent.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use threadloom::app::App;
use threadloom::control::Command;
use threadloom::graphs::{GraphBuilder, Router};
use threadloom::interrupts::{InterruptCapabilities, InterruptRequest, ResumeValue};
use threadloom::message::{Message, Role, ToolCall, DO_NOT_RENDER_ID_PREFIX};
use threadloom::node::{Node, NodeContext, NodeError, NodePartial};
use threadloom::runtimes::{CheckpointerType, RunOutcome, RuntimeConfig, ThreadRunner};
use threadloom::state::{StateSnapshot, VersionedState};
use threadloom::types::NodeKind;
use threadloom::utils::collections::new_extra_map;

/// The closed set of tools the booking agent can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ToolCallKind {
    SubmitHotelForm,
    SelectHotel,
    StripeProcessing,
    StripePayment,
}

impl ToolCallKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "submit_hotel_form" => Some(Self::SubmitHotelForm),
            "select_hotel" => Some(Self::SelectHotel),
            "stripe_processing" => Some(Self::StripeProcessing),
            "stripe_payment" => Some(Self::StripePayment),
            _ => None,
        }
    }

    fn target(self) -> NodeKind {
        match self {
            Self::SubmitHotelForm => custom("searchHotels"),
            Self::SelectHotel => custom("selectHotel"),
            Self::StripeProcessing | Self::StripePayment => custom("payStripe"),
        }
    }
}

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

/// Marks whether this turn opens a new trip request and maintains the trip
/// records: a new request closes out every prior trip and appends a fresh
/// one as the active trip.
struct ClassifyTripNode;

#[async_trait]
impl Node for ClassifyTripNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let first_turn = !snapshot.messages.iter().any(|m| m.has_role(Role::Assistant));
        let asked_for_new = snapshot
            .messages
            .iter()
            .rev()
            .find(|m| m.has_role(Role::User))
            .map(|m| m.text().to_lowercase().contains("new trip"))
            .unwrap_or(false);
        let is_new = first_turn || asked_for_new;

        let mut extra = new_extra_map();
        extra.insert("is_new_trip_request".to_string(), json!(is_new));
        if is_new {
            let mut trips: Vec<Value> = snapshot
                .extra
                .get("trips")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            // A trip is never deleted; starting a new one closes out the rest.
            for trip in &mut trips {
                trip["booking_confirmed_or_canceled"] = json!(true);
            }
            trips.push(json!({
                "id": format!("trip-{}", trips.len() + 1),
                "destination": null,
                "hotels": [],
                "selected_hotel": null,
                "booking_confirmed_or_canceled": false,
            }));
            extra.insert("active_trip_index".to_string(), json!(trips.len() - 1));
            extra.insert("trips".to_string(), json!(trips));
        }
        Ok(NodePartial::new().with_extra(extra))
    }
}

/// Asks the traveler to fill the hotel search form.
struct SearchDestinationNode;

#[async_trait]
impl Node for SearchDestinationNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let msg = Message::assistant("Great choice! Tell me your dates and budget.")
            .with_tool_calls(vec![ToolCall::new(
                "submit_hotel_form",
                json!({"destination": "Cairo"}),
            )]);
        Ok(NodePartial::new().with_messages(vec![msg]))
    }
}

/// Lists hotels for the submitted form and completes the form tool call.
struct SearchHotelsNode;

#[async_trait]
impl Node for SearchHotelsNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let call = Message::find_dangling_tool_calls(&snapshot.messages)
            .into_iter()
            .next()
            .ok_or(NodeError::MissingInput {
                what: "pending submit_hotel_form tool call",
            })?;
        ctx.emit("provider", "hotel search returned 2 results")?;
        let form_done = Message::hidden_tool_response(&call.id, "form submitted");
        let offer = Message::assistant("I found Nile View and Pyramid Lodge. Which one?")
            .with_tool_calls(vec![ToolCall::new("select_hotel", json!({}))]);
        Ok(NodePartial::new().with_messages(vec![form_done, offer]))
    }
}

/// Confirms the traveler's hotel choice and hands off to payment. Selection
/// requires the run's terms-acceptance flag.
struct SelectHotelNode;

#[async_trait]
impl Node for SelectHotelNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let terms_accepted = ctx
            .config("terms_accepted")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !terms_accepted {
            let msg =
                Message::assistant("Please accept the booking terms before I reserve a hotel.");
            return Ok(NodePartial::new().with_messages(vec![msg]));
        }
        let call = Message::find_dangling_tool_calls(&snapshot.messages)
            .into_iter()
            .next()
            .ok_or(NodeError::MissingInput {
                what: "pending select_hotel tool call",
            })?;
        let selected = Message::hidden_tool_response(&call.id, "hotel selected");
        let pay = Message::assistant("Nile View it is. Ready to pay?")
            .with_tool_calls(vec![ToolCall::new("stripe_payment", json!({"amount": 420}))]);
        Ok(NodePartial::new().with_messages(vec![selected, pay]))
    }
}

/// Payment gate: pauses for confirmation, then records the outcome and
/// completes the payment tool call.
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
        let receipt = Message::hidden_tool_response(&call_id, status);
        Ok(NodePartial::new()
            .with_messages(vec![receipt])
            .with_extra(extra))
    }
}

/// Final recap once the payment decision is in.
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
        Message::last_assistant_with_tool_calls(&snapshot.messages)
            .and_then(|m| m.tool_calls.first())
            .and_then(|call| ToolCallKind::from_name(&call.name))
            .map(ToolCallKind::target)
            .unwrap_or(NodeKind::End)
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

fn booking_app() -> App {
    booking_app_with(RuntimeConfig::default())
}

fn booking_app_with(runtime: RuntimeConfig) -> App {
    GraphBuilder::new()
        .with_runtime_config(runtime)
        .add_node(custom("classifyTrip"), ClassifyTripNode)
        .add_node(custom("searchDestination"), SearchDestinationNode)
        .add_node(custom("searchHotels"), SearchHotelsNode)
        .add_node(custom("selectHotel"), SelectHotelNode)
        .add_node(custom("payStripe"), PayStripeNode)
        .add_node(custom("summarizeTrip"), SummarizeTripNode)
        .add_edge(NodeKind::Start, custom("classifyTrip"))
        .add_conditional_edge(
            custom("classifyTrip"),
            classify_router(),
            vec![
                custom("searchDestination"),
                custom("searchHotels"),
                custom("selectHotel"),
                custom("payStripe"),
                NodeKind::End,
            ],
        )
        .add_edge(custom("searchDestination"), NodeKind::End)
        .add_edge(custom("searchHotels"), NodeKind::End)
        .add_edge(custom("selectHotel"), NodeKind::End)
        .add_conditional_edge(
            custom("payStripe"),
            pay_router(),
            vec![custom("summarizeTrip"), NodeKind::End],
        )
        .add_edge(custom("summarizeTrip"), NodeKind::End)
        .compile()
        .unwrap()
}

async fn run_turn(initial: VersionedState) -> (ThreadRunner, RunOutcome) {
    run_turn_of(booking_app(), initial).await
}

async fn run_turn_of(app: App, initial: VersionedState) -> (ThreadRunner, RunOutcome) {
    let mut runner = ThreadRunner::with_options(app, CheckpointerType::InMemory, true).await;
    runner.create_thread("trip".into(), initial).await.unwrap();
    let outcome = runner.run("trip").await.unwrap();
    (runner, outcome)
}

#[tokio::test]
async fn new_trip_request_routes_to_destination_search() {
    let initial = VersionedState::new_with_user_message("I want to visit Egypt");
    let (_runner, outcome) = run_turn(initial).await;

    let RunOutcome::Completed(state) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(state.extra.get().get("is_new_trip_request"), Some(&json!(true)));

    let last = state.messages.get().last().unwrap();
    assert!(last.has_tool_calls());
    assert_eq!(last.tool_calls[0].name, "submit_hotel_form");

    // The first trip record is opened and active.
    let trips = state.extra.get().get("trips").unwrap().as_array().unwrap();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0]["booking_confirmed_or_canceled"], json!(false));
    assert_eq!(state.extra.get().get("active_trip_index"), Some(&json!(0)));
}

#[tokio::test]
async fn second_trip_request_marks_prior_trip_terminal() {
    let initial = VersionedState::builder()
        .with_user_message("I want to visit Egypt")
        .with_message(Message::assistant("Your Cairo trip is in progress."))
        .with_message(Message::user("Actually, let's plan a new trip to Japan"))
        .with_extra(
            "trips",
            json!([{
                "id": "trip-1",
                "destination": "Cairo",
                "hotels": [],
                "selected_hotel": null,
                "booking_confirmed_or_canceled": false,
            }]),
        )
        .with_extra("active_trip_index", json!(0))
        .build();
    let (_runner, outcome) = run_turn(initial).await;

    let RunOutcome::Completed(state) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(state.extra.get().get("is_new_trip_request"), Some(&json!(true)));

    let trips = state.extra.get().get("trips").unwrap().as_array().unwrap();
    assert_eq!(trips.len(), 2);
    // The Cairo trip is closed out, never deleted.
    assert_eq!(trips[0]["booking_confirmed_or_canceled"], json!(true));
    assert_eq!(trips[1]["booking_confirmed_or_canceled"], json!(false));
    assert_eq!(state.extra.get().get("active_trip_index"), Some(&json!(1)));
}

#[tokio::test]
async fn pending_form_call_dispatches_to_hotel_search() {
    let form_request = Message::assistant("Tell me your dates.")
        .with_tool_calls(vec![ToolCall::new("submit_hotel_form", json!({}))]);
    let initial = VersionedState::new_with_messages(vec![
        Message::user("I want to visit Egypt"),
        form_request,
        Message::user("March 3-10, mid-range"),
    ]);
    let (_runner, outcome) = run_turn(initial).await;

    let RunOutcome::Completed(state) = outcome else {
        panic!("expected completion");
    };
    let last = state.messages.get().last().unwrap();
    assert!(last.text().contains("Nile View"));
    assert_eq!(last.tool_calls[0].name, "select_hotel");
    // The form call received its (hidden) response.
    let dangling = Message::find_dangling_tool_calls(state.messages.get());
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].name, "select_hotel");
}

#[tokio::test]
async fn payment_accept_confirms_and_summarizes() {
    let pay_request = Message::assistant("Ready to pay?")
        .with_tool_calls(vec![ToolCall::new("stripe_payment", json!({"amount": 420}))]);
    let initial = VersionedState::new_with_messages(vec![
        Message::user("book the Nile View"),
        pay_request,
        Message::user("yes go ahead"),
    ]);
    let (mut runner, outcome) = run_turn(initial).await;

    let RunOutcome::Interrupted { request, .. } = outcome else {
        panic!("expected payment interrupt");
    };
    assert_eq!(request.action, "stripe_payment");
    assert_eq!(request.args.get("amount"), Some(&json!(420)));
    assert!(request.capabilities.allow_accept);

    let RunOutcome::Completed(state) = runner
        .resume("trip", Command::resume(ResumeValue::Accept))
        .await
        .unwrap()
    else {
        panic!("expected completion after resume");
    };

    assert_eq!(state.extra.get().get("booking_status"), Some(&json!("confirmed")));
    let last = state.messages.get().last().unwrap();
    assert_eq!(last.text(), "Your trip is booked. Safe travels!");

    // The payment call is completed by a hidden tool response.
    assert!(Message::find_dangling_tool_calls(state.messages.get()).is_empty());
    assert!(state
        .messages
        .get()
        .iter()
        .any(|m| m.has_role(Role::Tool) && m.id.starts_with(DO_NOT_RENDER_ID_PREFIX)));
}

#[tokio::test]
async fn payment_ignore_cancels_but_still_summarizes() {
    let pay_request = Message::assistant("Ready to pay?")
        .with_tool_calls(vec![ToolCall::new("stripe_payment", json!({"amount": 420}))]);
    let initial = VersionedState::new_with_messages(vec![
        Message::user("book it"),
        pay_request,
        Message::user("hmm"),
    ]);
    let (mut runner, _outcome) = run_turn(initial).await;

    let RunOutcome::Completed(state) = runner
        .resume("trip", Command::resume(ResumeValue::Ignore))
        .await
        .unwrap()
    else {
        panic!("expected completion after resume");
    };

    assert_eq!(state.extra.get().get("booking_status"), Some(&json!("canceled")));
    let last = state.messages.get().last().unwrap();
    assert!(last.text().starts_with("Booking canceled"));
}

#[tokio::test]
async fn unknown_tool_name_falls_through_to_end() {
    let odd_request = Message::assistant("hmm")
        .with_tool_calls(vec![ToolCall::new("book_flight", json!({}))]);
    let initial = VersionedState::new_with_messages(vec![
        Message::user("continue"),
        odd_request,
        Message::user("ok"),
    ]);
    let (_runner, outcome) = run_turn(initial).await;

    // The router's default is End, not a routing error: End is declared.
    let RunOutcome::Completed(state) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(state.messages.len(), 3);
}

fn selection_turn() -> VersionedState {
    let choose = Message::assistant("Which hotel would you like?")
        .with_tool_calls(vec![ToolCall::new("select_hotel", json!({}))]);
    VersionedState::new_with_messages(vec![
        Message::user("I want to visit Egypt"),
        choose,
        Message::user("the Nile View please"),
    ])
}

#[tokio::test]
async fn hotel_selection_requires_accepted_terms() {
    let (_runner, outcome) = run_turn(selection_turn()).await;

    let RunOutcome::Completed(state) = outcome else {
        panic!("expected completion");
    };
    let last = state.messages.get().last().unwrap();
    assert!(last.text().contains("accept the booking terms"));
    // The selection call stays open until the terms are accepted.
    let dangling = Message::find_dangling_tool_calls(state.messages.get());
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].name, "select_hotel");
}

#[tokio::test]
async fn hotel_selection_with_terms_hands_off_to_payment() {
    let runtime = RuntimeConfig::default().with_config_value("terms_accepted", json!(true));
    let (_runner, outcome) = run_turn_of(booking_app_with(runtime), selection_turn()).await;

    let RunOutcome::Completed(state) = outcome else {
        panic!("expected completion");
    };
    let last = state.messages.get().last().unwrap();
    assert_eq!(last.tool_calls[0].name, "stripe_payment");
    let dangling = Message::find_dangling_tool_calls(state.messages.get());
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].name, "stripe_payment");
}
