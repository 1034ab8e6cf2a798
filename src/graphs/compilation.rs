//! Graph compilation and validation.
//!
//! Compilation checks the whole definition and collects *every* violation
//! before failing, so a misconfigured graph surfaces all its problems in a
//! single [`GraphDefinitionError`] rather than one fix-compile-fix cycle
//! per mistake.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::app::App;
use crate::graphs::ConditionalEdge;
use crate::types::NodeKind;

/// One structural problem found while validating a graph definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphViolation {
    /// An edge references a source node that was never registered.
    #[error("edge source {from} is not a registered node")]
    UnknownEdgeSource { from: NodeKind },

    /// An edge references a target node that was never registered.
    #[error("edge {from} -> {to} targets an unregistered node")]
    UnknownEdgeTarget { from: NodeKind, to: NodeKind },

    /// A conditional edge declares a candidate that was never registered.
    #[error("conditional edge from {from} declares unregistered candidate {candidate}")]
    UndeclaredCandidate {
        from: NodeKind,
        candidate: NodeKind,
    },

    /// No edge leaves the virtual Start node.
    #[error("no entry edge: exactly one edge must leave Start")]
    MissingEntryEdge,

    /// A registered node has no outgoing edge of either kind.
    #[error("node {node} has no outgoing edge")]
    DeadEnd { node: NodeKind },

    /// A node has more than one outgoing edge, or both an unconditional and
    /// a conditional edge.
    #[error("node {node} has conflicting outgoing edges")]
    ConflictingEdges { node: NodeKind },

    /// An edge targets the virtual Start node.
    #[error("edge {from} -> Start: Start has no incoming edges")]
    EdgeIntoStart { from: NodeKind },
}

/// Validation failure carrying every violation found in the definition.
#[derive(Debug, Error, Diagnostic)]
#[error("workflow graph failed validation with {} violation(s)", violations.len())]
#[diagnostic(
    code(threadloom::graphs::definition),
    help("Inspect `violations` for the full list of structural problems.")
)]
pub struct GraphDefinitionError {
    pub violations: Vec<GraphViolation>,
}

impl GraphDefinitionError {
    /// Whether a specific violation was reported.
    #[must_use]
    pub fn contains(&self, violation: &GraphViolation) -> bool {
        self.violations.contains(violation)
    }
}

impl super::builder::GraphBuilder {
    /// Compiles the graph into an executable application.
    ///
    /// Validates the definition and converts it into an [`App`]. Checks
    /// performed, each reported per offending node/edge:
    ///
    /// - unknown edge endpoints (source or target not registered)
    /// - conditional-edge candidates that are not registered nodes
    /// - missing or ambiguous entry edge from Start
    /// - registered nodes with no outgoing edge
    /// - conflicting outgoing edges (duplicate unconditional edges,
    ///   multiple conditional edges, or a mix of both on one node)
    /// - edges into the virtual Start node
    ///
    /// # Errors
    ///
    /// [`GraphDefinitionError`] enumerating *all* violations found.
    pub fn compile(self) -> Result<App, GraphDefinitionError> {
        let mut violations = Vec::new();

        let is_known = |kind: &NodeKind| -> bool {
            match kind {
                NodeKind::Start | NodeKind::End => true,
                NodeKind::Custom(_) => self.nodes.contains_key(kind),
            }
        };

        // Edge endpoint checks.
        for (from, to) in &self.edges {
            if !is_known(from) {
                violations.push(GraphViolation::UnknownEdgeSource { from: from.clone() });
            }
            if *to == NodeKind::Start {
                violations.push(GraphViolation::EdgeIntoStart { from: from.clone() });
            } else if !is_known(to) {
                violations.push(GraphViolation::UnknownEdgeTarget {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }
        for edge in &self.conditional_edges {
            if !is_known(edge.from()) {
                violations.push(GraphViolation::UnknownEdgeSource {
                    from: edge.from().clone(),
                });
            }
            for candidate in edge.candidates() {
                if *candidate == NodeKind::Start {
                    violations.push(GraphViolation::EdgeIntoStart {
                        from: edge.from().clone(),
                    });
                } else if !is_known(candidate) {
                    violations.push(GraphViolation::UndeclaredCandidate {
                        from: edge.from().clone(),
                        candidate: candidate.clone(),
                    });
                }
            }
        }

        // Successor-count checks: at most one outgoing edge per node, of one
        // kind, and exactly one edge leaving Start.
        let mut unconditional: FxHashMap<NodeKind, Vec<NodeKind>> = FxHashMap::default();
        for (from, to) in &self.edges {
            unconditional
                .entry(from.clone())
                .or_default()
                .push(to.clone());
        }
        let mut conditional_by_from: FxHashMap<NodeKind, usize> = FxHashMap::default();
        for edge in &self.conditional_edges {
            *conditional_by_from.entry(edge.from().clone()).or_default() += 1;
        }

        let entry_count = unconditional
            .get(&NodeKind::Start)
            .map(Vec::len)
            .unwrap_or(0);
        match entry_count {
            0 => violations.push(GraphViolation::MissingEntryEdge),
            1 => {}
            _ => violations.push(GraphViolation::ConflictingEdges {
                node: NodeKind::Start,
            }),
        }
        if conditional_by_from.contains_key(&NodeKind::Start) {
            // Routing off Start would make the entry state-dependent.
            violations.push(GraphViolation::ConflictingEdges {
                node: NodeKind::Start,
            });
        }

        for node in self.nodes.keys() {
            let plain = unconditional.get(node).map(Vec::len).unwrap_or(0);
            let routed = conditional_by_from.get(node).copied().unwrap_or(0);
            match (plain, routed) {
                (0, 0) => violations.push(GraphViolation::DeadEnd { node: node.clone() }),
                (1, 0) | (0, 1) => {}
                _ => violations.push(GraphViolation::ConflictingEdges { node: node.clone() }),
            }
        }

        if !violations.is_empty() {
            return Err(GraphDefinitionError { violations });
        }

        let edges: FxHashMap<NodeKind, NodeKind> = unconditional
            .into_iter()
            .map(|(from, mut targets)| {
                // Validated above: exactly one target per source.
                (from, targets.pop().expect("validated edge list non-empty"))
            })
            .collect();
        let conditional_edges: FxHashMap<NodeKind, ConditionalEdge> = self
            .conditional_edges
            .into_iter()
            .map(|edge| (edge.from().clone(), edge))
            .collect();

        Ok(App::from_parts(
            self.nodes,
            edges,
            conditional_edges,
            self.runtime_config,
        ))
    }
}
