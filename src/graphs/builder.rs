//! GraphBuilder implementation for constructing workflow graphs.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::edges::{ConditionalEdge, Router};
use crate::node::Node;
use crate::runtimes::RuntimeConfig;
use crate::types::NodeKind;

/// Builder for constructing workflow graphs with a fluent API.
///
/// Every graph must have:
/// - at least one executable node added via [`add_node`](Self::add_node),
/// - exactly one edge leaving `NodeKind::Start` (the entry node),
/// - an outgoing edge (unconditional or conditional) on every node.
///
/// `NodeKind::Start` and `NodeKind::End` are virtual endpoints and must
/// never be registered with `add_node`; they exist only for topology.
///
/// # Examples
///
/// ```
/// use threadloom::graphs::GraphBuilder;
/// use threadloom::types::NodeKind;
///
/// # struct MyNode;
/// # #[async_trait::async_trait]
/// # impl threadloom::node::Node for MyNode {
/// #     async fn run(&self, _: threadloom::state::StateSnapshot, _: threadloom::node::NodeContext) -> Result<threadloom::node::NodePartial, threadloom::node::NodeError> {
/// #         Ok(threadloom::node::NodePartial::default())
/// #     }
/// # }
/// let app = GraphBuilder::new()
///     .add_node(NodeKind::Custom("worker".into()), MyNode)
///     .add_edge(NodeKind::Start, NodeKind::Custom("worker".into()))
///     .add_edge(NodeKind::Custom("worker".into()), NodeKind::End)
///     .compile()
///     .unwrap();
/// ```
pub struct GraphBuilder {
    /// Registry of all nodes in the graph, keyed by their identifier.
    pub nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    /// Unconditional edges. Conflicting duplicates are kept here and
    /// rejected at compile time so all violations can be reported together.
    pub edges: Vec<(NodeKind, NodeKind)>,
    /// Conditional edges for state-dependent routing.
    pub conditional_edges: Vec<ConditionalEdge>,
    /// Runtime configuration for the compiled application.
    pub runtime_config: RuntimeConfig,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new, empty graph builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: Vec::new(),
            conditional_edges: Vec::new(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Adds a node to the graph.
    ///
    /// `NodeKind::Start` and `NodeKind::End` are virtual; attempts to
    /// register them are ignored with a warning.
    #[must_use]
    pub fn add_node(mut self, id: NodeKind, node: impl Node + 'static) -> Self {
        match id {
            NodeKind::Start | NodeKind::End => {
                tracing::warn!(
                    ?id,
                    "ignoring registration of virtual node kind (Start/End are virtual)"
                );
            }
            _ => {
                self.nodes.insert(id, Arc::new(node));
            }
        }
        self
    }

    /// Adds an unconditional edge between two nodes.
    ///
    /// Each node may have at most one outgoing edge; a second edge from the
    /// same source is a compile-time violation.
    #[must_use]
    pub fn add_edge(mut self, from: NodeKind, to: NodeKind) -> Self {
        self.edges.push((from, to));
        self
    }

    /// Adds a conditional edge with its router and declared candidate set.
    ///
    /// When execution reaches `from`, the router is evaluated against the
    /// current snapshot and must return one of `candidates`.
    ///
    /// ```
    /// use threadloom::graphs::{GraphBuilder, Router};
    /// use threadloom::types::NodeKind;
    /// use std::sync::Arc;
    ///
    /// # struct MyNode;
    /// # #[async_trait::async_trait]
    /// # impl threadloom::node::Node for MyNode {
    /// #     async fn run(&self, _: threadloom::state::StateSnapshot, _: threadloom::node::NodeContext) -> Result<threadloom::node::NodePartial, threadloom::node::NodeError> {
    /// #         Ok(threadloom::node::NodePartial::default())
    /// #     }
    /// # }
    /// let router: Router = Arc::new(|snapshot| {
    ///     if snapshot.messages.len() > 5 {
    ///         NodeKind::Custom("summarize".into())
    ///     } else {
    ///         NodeKind::End
    ///     }
    /// });
    ///
    /// let builder = GraphBuilder::new()
    ///     .add_node(NodeKind::Custom("chat".into()), MyNode)
    ///     .add_node(NodeKind::Custom("summarize".into()), MyNode)
    ///     .add_edge(NodeKind::Start, NodeKind::Custom("chat".into()))
    ///     .add_conditional_edge(
    ///         NodeKind::Custom("chat".into()),
    ///         router,
    ///         vec![NodeKind::Custom("summarize".into()), NodeKind::End],
    ///     )
    ///     .add_edge(NodeKind::Custom("summarize".into()), NodeKind::End);
    /// ```
    #[must_use]
    pub fn add_conditional_edge(
        mut self,
        from: NodeKind,
        router: Router,
        candidates: Vec<NodeKind>,
    ) -> Self {
        self.conditional_edges
            .push(ConditionalEdge::new(from, router, candidates));
        self
    }

    /// Configures runtime settings for the compiled application.
    #[must_use]
    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = runtime_config;
        self
    }
}
