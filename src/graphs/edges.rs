//! Edge types and routing for conditional graph flow.
//!
//! Execution is strictly sequential: each node has either exactly one
//! unconditional successor or one conditional edge whose router picks the
//! single next node from a statically declared candidate set.

use crate::state::StateSnapshot;
use crate::types::NodeKind;
use std::sync::Arc;

/// Router function for conditional edges.
///
/// A pure function of the current snapshot returning the single next node.
/// The returned node must be a member of the edge's declared candidate set;
/// anything else is a fatal
/// [`RoutingError`](crate::runtimes::RoutingError) at run time.
///
/// # Examples
///
/// ```
/// use threadloom::graphs::Router;
/// use threadloom::types::NodeKind;
/// use std::sync::Arc;
///
/// let by_flag: Router = Arc::new(|snapshot| {
///     if snapshot.extra.get("is_new_trip_request").and_then(|v| v.as_bool()) == Some(true) {
///         NodeKind::Custom("searchDestination".into())
///     } else {
///         NodeKind::End
///     }
/// });
/// ```
pub type Router = Arc<dyn Fn(&StateSnapshot) -> NodeKind + Send + Sync + 'static>;

/// A conditional edge: router plus its declared candidate set.
///
/// Declaring candidates up front lets compilation verify that every node a
/// router can choose exists, and lets the runner reject out-of-set routing
/// decisions before any further node runs.
#[derive(Clone)]
pub struct ConditionalEdge {
    from: NodeKind,
    router: Router,
    candidates: Vec<NodeKind>,
}

impl ConditionalEdge {
    /// Creates a conditional edge.
    pub fn new(from: impl Into<NodeKind>, router: Router, candidates: Vec<NodeKind>) -> Self {
        Self {
            from: from.into(),
            router,
            candidates,
        }
    }

    /// The source node of this edge.
    pub fn from(&self) -> &NodeKind {
        &self.from
    }

    /// The router function.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The declared candidate set.
    pub fn candidates(&self) -> &[NodeKind] {
        &self.candidates
    }

    /// Whether `target` is a declared candidate.
    #[must_use]
    pub fn permits(&self, target: &NodeKind) -> bool {
        self.candidates.contains(target)
    }
}

impl std::fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("from", &self.from)
            .field("candidates", &self.candidates)
            .finish_non_exhaustive()
    }
}
