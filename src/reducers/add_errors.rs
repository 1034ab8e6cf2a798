use super::Reducer;
use crate::{node::NodePartial, state::VersionedState};

/// Plain append for the errors channel, preserving emission order.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct AddErrors;

impl Reducer for AddErrors {
    fn apply(&self, state: &mut VersionedState, update: &NodePartial) {
        if let Some(errors_update) = &update.errors {
            if errors_update.is_empty() {
                return;
            }
            state.errors.get_mut().extend(errors_update.iter().cloned());
        }
    }
}
