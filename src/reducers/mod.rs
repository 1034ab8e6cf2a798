//! Merge strategies for applying partial updates to channel state.
//!
//! Each channel has one reducer: messages use merge-by-id append
//! ([`AddMessages`]), extra uses per-key replacement ([`MapMerge`]), errors
//! use plain append ([`AddErrors`]). The [`ReducerRegistry`] dispatches a
//! [`NodePartial`](crate::node::NodePartial) to the reducers registered for
//! the channels it touches.

mod add_errors;
mod add_messages;
mod map_merge;
mod reducer_registry;

pub use add_errors::AddErrors;
pub use add_messages::AddMessages;
pub use map_merge::MapMerge;
pub use reducer_registry::*;

use crate::node::NodePartial;
use crate::state::VersionedState;
use crate::types::ChannelType;
use miette::Diagnostic;
use thiserror::Error;

/// Unified reducer trait: every reducer mutates `VersionedState` using a
/// `NodePartial` delta. Reducers never touch version counters; the update
/// barrier bumps versions after detecting actual content change.
pub trait Reducer: Send + Sync {
    fn apply(&self, state: &mut VersionedState, update: &NodePartial);
}

/// A partial update named a channel the state schema does not declare.
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    /// The partial carried data for a channel with no registered reducer.
    #[error("no reducer registered for channel: {0}")]
    #[diagnostic(
        code(threadloom::reducers::unknown_channel),
        help("Register a reducer for the channel or remove the data from the partial.")
    )]
    UnknownChannel(ChannelType),
}
