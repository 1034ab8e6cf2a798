//! Structured runtime events and their broadcast bus.
//!
//! Nodes and the runner push [`Event`]s into an [`EventBus`]; a background
//! listener fans each event out to the registered [`EventSink`]s (stdout,
//! in-memory capture, or a tokio channel for live consumers).

mod bus;
mod event;
mod sink;

pub use bus::EventBus;
pub use event::{DiagnosticEvent, Event, InterruptEvent, NodeEvent, UpdateEvent};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
