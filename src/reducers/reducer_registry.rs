use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::{
    node::NodePartial,
    reducers::{AddErrors, AddMessages, MapMerge, Reducer, SchemaError},
    state::VersionedState,
    types::ChannelType,
};
use tracing::instrument;

/// Maps channel types to the reducers that merge updates into them.
///
/// The default registry covers the fixed channel set: messages
/// ([`AddMessages`]), extra ([`MapMerge`]), errors ([`AddErrors`]).
#[derive(Clone)]
pub struct ReducerRegistry {
    reducer_map: FxHashMap<ChannelType, Vec<Arc<dyn Reducer>>>,
}

/// Guard that checks whether a NodePartial actually has meaningful data
/// for the specified channel, so the registry can skip reducers with
/// nothing to do.
fn channel_guard(channel: &ChannelType, partial: &NodePartial) -> bool {
    match channel {
        ChannelType::Messages => partial
            .messages
            .as_ref()
            .map(|v| !v.is_empty())
            .unwrap_or(false),
        ChannelType::Extra => partial
            .extra
            .as_ref()
            .map(|m| !m.is_empty())
            .unwrap_or(false),
        ChannelType::Errors => partial
            .errors
            .as_ref()
            .map(|v| !v.is_empty())
            .unwrap_or(false),
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register(ChannelType::Messages, Arc::new(AddMessages))
            .register(ChannelType::Extra, Arc::new(MapMerge))
            .register(ChannelType::Errors, Arc::new(AddErrors));
        registry
    }
}

impl ReducerRegistry {
    /// Creates an empty registry. Updates against an empty registry fail
    /// with [`SchemaError::UnknownChannel`] for any populated channel.
    pub fn new() -> Self {
        Self {
            reducer_map: FxHashMap::default(),
        }
    }

    /// Registers a reducer for a channel. Multiple reducers on the same
    /// channel apply in registration order.
    pub fn register(&mut self, channel: ChannelType, reducer: Arc<dyn Reducer>) -> &mut Self {
        self.reducer_map.entry(channel).or_default().push(reducer);
        self
    }

    /// Builder-style registration.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use threadloom::reducers::{ReducerRegistry, AddMessages};
    /// use threadloom::types::ChannelType;
    ///
    /// let registry = ReducerRegistry::new()
    ///     .with_reducer(ChannelType::Messages, Arc::new(AddMessages));
    /// ```
    #[must_use]
    pub fn with_reducer(mut self, channel: ChannelType, reducer: Arc<dyn Reducer>) -> Self {
        self.register(channel, reducer);
        self
    }

    /// Apply the partial to one channel if it carries data for it.
    #[instrument(skip(self, state, to_update), err)]
    pub fn try_update(
        &self,
        channel_type: ChannelType,
        state: &mut VersionedState,
        to_update: &NodePartial,
    ) -> Result<(), SchemaError> {
        // Skip if the partial has no applicable data for this channel.
        if !channel_guard(&channel_type, to_update) {
            return Ok(());
        }

        if let Some(reducers) = self.reducer_map.get(&channel_type) {
            for reducer in reducers {
                reducer.apply(state, to_update);
            }
            Ok(())
        } else {
            Err(SchemaError::UnknownChannel(channel_type))
        }
    }

    /// Apply the partial across every channel it names.
    ///
    /// Channels with data but no registered reducer produce
    /// [`SchemaError::UnknownChannel`] before any other channel is merged,
    /// leaving `state` untouched in that case only if the failing channel
    /// sorts first; callers wanting atomicity should validate registration
    /// up front (the compiled [`App`](crate::app::App) does).
    pub fn apply_all(
        &self,
        state: &mut VersionedState,
        update: &NodePartial,
    ) -> Result<(), SchemaError> {
        for channel in [ChannelType::Messages, ChannelType::Extra, ChannelType::Errors] {
            if channel_guard(&channel, update) && !self.reducer_map.contains_key(&channel) {
                return Err(SchemaError::UnknownChannel(channel));
            }
        }
        for channel in [ChannelType::Messages, ChannelType::Extra, ChannelType::Errors] {
            self.try_update(channel, state, update)?;
        }
        Ok(())
    }
}
