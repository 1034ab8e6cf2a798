//! # Threadloom: Graph-driven Conversational Workflow Engine
//!
//! Threadloom is a framework for building stateful, multi-turn conversational
//! workflows as graphs: nodes produce partial state updates that are merged
//! through per-channel reducers, routers pick the single next node from a
//! declared candidate set, and threads can pause for human input and resume
//! later, surviving process restarts through checkpointing.
//!
//! ## Core Concepts
//!
//! - **Nodes**: Async units of work that observe a state snapshot and return
//!   a partial update
//! - **Channels**: Versioned state slices (messages, extra, errors), each
//!   merged by its own reducer
//! - **Graph**: Declarative topology with one successor per node, either
//!   fixed or chosen by a router
//! - **Interrupts**: Nodes suspend their thread to await external input;
//!   resumption replays the node with answers queued
//! - **Threads**: Isolated conversations, each with its own checkpoint log
//!
//! ## Quick Start
//!
//! ### Working with Messages
//!
//! ```
//! use threadloom::message::{Message, Role};
//!
//! let user_msg = Message::user("What's the weather like?");
//! let assistant_msg = Message::assistant("It's sunny and 24°C!");
//! let system_msg = Message::system("You are a helpful assistant.");
//!
//! assert!(user_msg.has_role(Role::User));
//! assert!(!user_msg.has_role(Role::Assistant));
//! ```
//!
//! ### Building a Simple Workflow
//!
//! ```
//! use threadloom::{
//!     graphs::GraphBuilder,
//!     message::Message,
//!     node::{Node, NodeContext, NodeError, NodePartial},
//!     state::StateSnapshot,
//!     types::NodeKind,
//! };
//! use async_trait::async_trait;
//!
//! struct GreetingNode;
//!
//! #[async_trait]
//! impl Node for GreetingNode {
//!     async fn run(
//!         &self,
//!         _snapshot: StateSnapshot,
//!         _ctx: NodeContext,
//!     ) -> Result<NodePartial, NodeError> {
//!         let greeting = Message::assistant("Hello! How can I help you today?");
//!         Ok(NodePartial::new().with_messages(vec![greeting]))
//!     }
//! }
//!
//! let app = GraphBuilder::new()
//!     .add_node(NodeKind::Custom("greet".into()), GreetingNode)
//!     .add_edge(NodeKind::Start, NodeKind::Custom("greet".into()))
//!     .add_edge(NodeKind::Custom("greet".into()), NodeKind::End)
//!     .compile()
//!     .unwrap();
//! ```
//!
//! ### State Management
//!
//! ```
//! use threadloom::state::VersionedState;
//!
//! let state = VersionedState::new_with_user_message("Hello, system!");
//!
//! // Or use the builder pattern for richer initialization
//! let complex_state = VersionedState::builder()
//!     .with_user_message("What's the weather?")
//!     .with_system_message("You are a weather assistant")
//!     .with_extra("location", serde_json::json!("San Francisco"))
//!     .build();
//! ```
//!
//! ## Module Guide
//!
//! - [`message`] - Message types, tool calls, and construction utilities
//! - [`state`] - Versioned state management and snapshots
//! - [`channels`] - Channel-based state storage and versioning
//! - [`reducers`] - Per-channel merge strategies
//! - [`node`] - Node trait and execution primitives
//! - [`interrupts`] - Human-in-the-loop pause/resume protocol
//! - [`control`] - Resume commands and the stop signal
//! - [`graphs`] - Workflow graph definition and compilation
//! - [`app`] - The compiled, executable workflow
//! - [`runtimes`] - Thread orchestration and checkpointing
//! - [`event_bus`] - Structured runtime events and sinks

pub mod app;
pub mod channels;
pub mod control;
pub mod event_bus;
pub mod graphs;
pub mod interrupts;
pub mod message;
pub mod node;
pub mod reducers;
pub mod runtimes;
pub mod state;
pub mod types;
pub mod utils;
