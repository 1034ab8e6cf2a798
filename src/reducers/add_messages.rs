use super::Reducer;
use crate::{message::Role, node::NodePartial, state::VersionedState};

/// Merge-by-id append for the messages channel.
///
/// Incoming messages are appended in order, except:
/// - an incoming message whose id matches an existing one replaces it in
///   place (content revision keeps transcript position),
/// - an incoming `Role::Remove` directive deletes the message with the same
///   id and is itself discarded.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct AddMessages;

impl Reducer for AddMessages {
    fn apply(&self, state: &mut VersionedState, update: &NodePartial) {
        let Some(incoming) = &update.messages else {
            return;
        };
        if incoming.is_empty() {
            return;
        }
        let existing = state.messages.get_mut();
        for msg in incoming {
            if msg.role == Role::Remove {
                existing.retain(|m| m.id != msg.id);
                continue;
            }
            match existing.iter_mut().find(|m| m.id == msg.id) {
                Some(slot) => *slot = msg.clone(),
                None => existing.push(msg.clone()),
            }
        }
    }
}
