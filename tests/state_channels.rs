mod common;

use common::NoopNode;
use serde_json::json;
use threadloom::app::App;
use threadloom::channels::errors::{ErrorEvent, FaultDetail};
use threadloom::channels::Channel;
use threadloom::graphs::GraphBuilder;
use threadloom::message::Message;
use threadloom::node::NodePartial;
use threadloom::state::VersionedState;
use threadloom::types::{ChannelType, NodeKind};
use threadloom::utils::collections::new_extra_map;

fn tiny_app() -> App {
    GraphBuilder::new()
        .add_node(NodeKind::Custom("noop".into()), NoopNode)
        .add_edge(NodeKind::Start, NodeKind::Custom("noop".into()))
        .add_edge(NodeKind::Custom("noop".into()), NodeKind::End)
        .compile()
        .unwrap()
}

#[test]
fn snapshot_is_isolated_from_later_mutation() {
    let mut state = VersionedState::new_with_user_message("hi");
    let snapshot = state.snapshot();

    state.add_message(Message::assistant("later"));
    state.add_extra("k", json!(1));

    assert_eq!(snapshot.messages.len(), 1);
    assert!(snapshot.extra.is_empty());
    assert_eq!(state.messages.len(), 2);
}

#[test]
fn apply_update_bumps_only_changed_channels() {
    let app = tiny_app();
    let mut state = VersionedState::new_with_user_message("hi");
    let messages_v = state.messages.version();
    let extra_v = state.extra.version();
    let errors_v = state.errors.version();

    let update = NodePartial::new().with_messages(vec![Message::assistant("reply")]);
    let updated = app.apply_update(&mut state, &update).unwrap();

    assert_eq!(updated, vec![ChannelType::Messages]);
    assert_eq!(state.messages.version(), messages_v + 1);
    assert_eq!(state.extra.version(), extra_v);
    assert_eq!(state.errors.version(), errors_v);
}

#[test]
fn apply_update_with_no_content_change_keeps_versions() {
    let app = tiny_app();
    let mut state = VersionedState::new_with_user_message("hi");
    let existing = state.messages.get()[0].clone();
    let messages_v = state.messages.version();

    // Re-sending an identical message replaces it with itself.
    let update = NodePartial::new().with_messages(vec![existing]);
    let updated = app.apply_update(&mut state, &update).unwrap();

    assert!(updated.is_empty());
    assert_eq!(state.messages.version(), messages_v);
}

#[test]
fn apply_update_reports_channels_in_fixed_order() {
    let app = tiny_app();
    let mut state = VersionedState::new_with_user_message("hi");

    let mut extra = new_extra_map();
    extra.insert("k".to_string(), json!("v"));
    let update = NodePartial::new()
        .with_errors(vec![ErrorEvent::app(FaultDetail::msg("boom"))])
        .with_extra(extra)
        .with_messages(vec![Message::assistant("reply")]);

    let updated = app.apply_update(&mut state, &update).unwrap();
    assert_eq!(
        updated,
        vec![ChannelType::Messages, ChannelType::Extra, ChannelType::Errors]
    );
}

#[test]
fn builder_assembles_all_channels() {
    let state = VersionedState::builder()
        .with_system_message("be brief")
        .with_user_message("hi")
        .with_extra("k", json!(2))
        .build();

    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.extra.get().get("k"), Some(&json!(2)));
    assert!(state.errors.is_empty());
}
