use super::Reducer;
use crate::{node::NodePartial, state::VersionedState};

/// Per-key replacement for the extra channel.
///
/// Shallow merge: each incoming key replaces the stored value wholesale.
/// Workflows that need finer granularity store under finer keys.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct MapMerge;

impl Reducer for MapMerge {
    fn apply(&self, state: &mut VersionedState, update: &NodePartial) {
        if let Some(extras_update) = &update.extra {
            if extras_update.is_empty() {
                return;
            }
            let state_map = state.extra.get_mut();
            for (k, v) in extras_update.iter() {
                state_map.insert(k.clone(), v.clone());
            }
        }
    }
}
