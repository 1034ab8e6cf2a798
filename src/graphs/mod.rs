//! Workflow graph definition and compilation.
//!
//! [`GraphBuilder`] collects nodes and edges through a fluent API;
//! [`compile`](GraphBuilder::compile) validates the whole definition and
//! produces an executable [`App`](crate::app::App), reporting every
//! violation at once in a [`GraphDefinitionError`].

pub mod builder;
pub mod compilation;
pub mod edges;

pub use builder::GraphBuilder;
pub use compilation::{GraphDefinitionError, GraphViolation};
pub use edges::{ConditionalEdge, Router};
