use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use threadloom::channels::errors::{ErrorEvent, FaultDetail};
use threadloom::message::{Message, Role};
use threadloom::node::NodePartial;
use threadloom::reducers::{AddErrors, AddMessages, MapMerge, Reducer, ReducerRegistry, SchemaError};
use threadloom::state::VersionedState;
use threadloom::types::ChannelType;
use threadloom::utils::collections::new_extra_map;

#[test]
fn add_messages_appends_in_order() {
    let mut state = VersionedState::new_with_user_message("hi");
    let update = NodePartial::new().with_messages(vec![
        Message::assistant("first"),
        Message::assistant("second"),
    ]);

    AddMessages.apply(&mut state, &update);

    let texts: Vec<String> = state.messages.get().iter().map(Message::text).collect();
    assert_eq!(texts, vec!["hi", "first", "second"]);
}

#[test]
fn add_messages_replaces_matching_id_in_place() {
    let mut state = VersionedState::new_with_user_message("hi");
    let draft = Message::assistant("draft").with_id("m-1");
    AddMessages.apply(
        &mut state,
        &NodePartial::new().with_messages(vec![draft, Message::assistant("tail")]),
    );

    let revised = Message::assistant("revised").with_id("m-1");
    AddMessages.apply(&mut state, &NodePartial::new().with_messages(vec![revised]));

    let texts: Vec<String> = state.messages.get().iter().map(Message::text).collect();
    // Revision keeps its transcript position, before "tail".
    assert_eq!(texts, vec!["hi", "revised", "tail"]);
}

#[test]
fn add_messages_remove_directive_deletes_by_id() {
    let mut state = VersionedState::new_with_user_message("hi");
    AddMessages.apply(
        &mut state,
        &NodePartial::new().with_messages(vec![Message::assistant("gone").with_id("m-1")]),
    );

    AddMessages.apply(
        &mut state,
        &NodePartial::new().with_messages(vec![Message::remove("m-1")]),
    );

    let messages = state.messages.get();
    assert_eq!(messages.len(), 1);
    assert!(!messages.iter().any(|m| m.role == Role::Remove));
}

#[test]
fn map_merge_replaces_per_key() {
    let mut state = VersionedState::new_with_user_message("hi");
    state.add_extra("keep", json!(1));
    state.add_extra("swap", json!("old"));

    let mut extra = new_extra_map();
    extra.insert("swap".to_string(), json!("new"));
    extra.insert("fresh".to_string(), json!(true));
    MapMerge.apply(&mut state, &NodePartial::new().with_extra(extra));

    let map = state.extra.get();
    assert_eq!(map.get("keep"), Some(&json!(1)));
    assert_eq!(map.get("swap"), Some(&json!("new")));
    assert_eq!(map.get("fresh"), Some(&json!(true)));
}

#[test]
fn add_errors_appends() {
    let mut state = VersionedState::new_with_user_message("hi");
    let events = vec![
        ErrorEvent::app(FaultDetail::msg("one")),
        ErrorEvent::app(FaultDetail::msg("two")),
    ];
    AddErrors.apply(&mut state, &NodePartial::new().with_errors(events));

    assert_eq!(state.errors.len(), 2);
}

#[test]
fn registry_rejects_unregistered_channel_with_data() {
    let registry = ReducerRegistry::new().with_reducer(ChannelType::Messages, Arc::new(AddMessages));
    let mut state = VersionedState::new_with_user_message("hi");

    let mut extra = new_extra_map();
    extra.insert("k".to_string(), json!(1));
    let update = NodePartial::new()
        .with_messages(vec![Message::assistant("a")])
        .with_extra(extra);

    let err = registry.apply_all(&mut state, &update).unwrap_err();
    assert!(matches!(err, SchemaError::UnknownChannel(ChannelType::Extra)));
    // Pre-check fails before anything merges.
    assert_eq!(state.messages.len(), 1);
}

#[test]
fn registry_skips_channels_without_data() {
    let registry = ReducerRegistry::new().with_reducer(ChannelType::Messages, Arc::new(AddMessages));
    let mut state = VersionedState::new_with_user_message("hi");

    // Empty vectors count as "no data" and never hit the schema check.
    let update = NodePartial::new()
        .with_messages(vec![])
        .with_extra(new_extra_map())
        .with_errors(vec![]);
    registry.apply_all(&mut state, &update).unwrap();
    assert_eq!(state.messages.len(), 1);
}

proptest! {
    #[test]
    fn add_messages_with_fresh_ids_grows_by_batch_len(batch in prop::collection::vec("[a-z]{1,12}", 0..16)) {
        let mut state = VersionedState::new_with_user_message("seed");
        let before = state.messages.len();
        let incoming: Vec<Message> = batch.iter().map(|t| Message::assistant(t)).collect();
        let n = incoming.len();

        AddMessages.apply(&mut state, &NodePartial::new().with_messages(incoming));
        prop_assert_eq!(state.messages.len(), before + n);
    }

    #[test]
    fn map_merge_last_write_wins(values in prop::collection::vec(0i64..1000, 1..10)) {
        let mut state = VersionedState::new_with_user_message("seed");
        for v in &values {
            let mut extra = new_extra_map();
            extra.insert("slot".to_string(), json!(v));
            MapMerge.apply(&mut state, &NodePartial::new().with_extra(extra));
        }
        let last = values.last().unwrap();
        prop_assert_eq!(state.extra.get().get("slot"), Some(&json!(last)));
    }
}
