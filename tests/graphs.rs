mod common;

use common::{NoopNode, SimpleMessageNode};
use std::sync::Arc;
use threadloom::graphs::{GraphBuilder, GraphViolation};
use threadloom::types::NodeKind;

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

#[test]
fn compile_accepts_linear_graph() {
    let app = GraphBuilder::new()
        .add_node(custom("a"), SimpleMessageNode::new("a"))
        .add_node(custom("b"), SimpleMessageNode::new("b"))
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), custom("b"))
        .add_edge(custom("b"), NodeKind::End)
        .compile()
        .unwrap();

    assert_eq!(*app.entry(), custom("a"));
    assert_eq!(app.nodes().len(), 2);
    assert_eq!(app.edges().get(&custom("a")), Some(&custom("b")));
}

#[test]
fn compile_accepts_conditional_terminal() {
    // A node whose only exit is a router needs no unconditional edge.
    let app = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_node(custom("b"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .add_conditional_edge(
            custom("a"),
            Arc::new(|_snapshot| NodeKind::End),
            vec![custom("b"), NodeKind::End],
        )
        .add_edge(custom("b"), NodeKind::End)
        .compile()
        .unwrap();

    assert!(app.conditional_edges().contains_key(&custom("a")));
}

#[test]
fn compile_rejects_missing_entry() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_edge(custom("a"), NodeKind::End)
        .compile()
        .unwrap_err();

    assert!(err.contains(&GraphViolation::MissingEntryEdge));
}

#[test]
fn compile_rejects_dead_end_node() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_node(custom("island"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), NodeKind::End)
        .compile()
        .unwrap_err();

    assert!(err.contains(&GraphViolation::DeadEnd {
        node: custom("island")
    }));
}

#[test]
fn compile_rejects_conflicting_edges() {
    // Two unconditional successors.
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_node(custom("b"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), custom("b"))
        .add_edge(custom("a"), NodeKind::End)
        .add_edge(custom("b"), NodeKind::End)
        .compile()
        .unwrap_err();
    assert!(err.contains(&GraphViolation::ConflictingEdges { node: custom("a") }));

    // An unconditional edge plus a router on the same node.
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), NodeKind::End)
        .add_conditional_edge(custom("a"), Arc::new(|_s| NodeKind::End), vec![NodeKind::End])
        .compile()
        .unwrap_err();
    assert!(err.contains(&GraphViolation::ConflictingEdges { node: custom("a") }));
}

#[test]
fn compile_rejects_unknown_endpoints_and_candidates() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("ghost"), NodeKind::End)
        .add_conditional_edge(
            custom("a"),
            Arc::new(|_s| NodeKind::End),
            vec![custom("phantom"), NodeKind::End],
        )
        .compile()
        .unwrap_err();

    assert!(err.contains(&GraphViolation::UnknownEdgeSource {
        from: custom("ghost")
    }));
    assert!(err.contains(&GraphViolation::UndeclaredCandidate {
        from: custom("a"),
        candidate: custom("phantom"),
    }));
}

#[test]
fn compile_rejects_edges_into_start() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(custom("a"), NodeKind::Start)
        .compile()
        .unwrap_err();

    assert!(err.contains(&GraphViolation::EdgeIntoStart { from: custom("a") }));
}

#[test]
fn compile_collects_every_violation_at_once() {
    // One broken definition, three distinct problems, all reported together.
    let err = GraphBuilder::new()
        .add_node(custom("a"), NoopNode)
        .add_node(custom("island"), NoopNode)
        .add_edge(custom("a"), custom("missing"))
        .compile()
        .unwrap_err();

    assert!(err.contains(&GraphViolation::MissingEntryEdge));
    assert!(err.contains(&GraphViolation::UnknownEdgeTarget {
        from: custom("a"),
        to: custom("missing"),
    }));
    assert!(err.contains(&GraphViolation::DeadEnd {
        node: custom("island")
    }));
    assert!(err.violations.len() >= 3);
}

#[test]
fn builder_ignores_virtual_node_registration() {
    // Registering Start or End as a worker node is a no-op.
    let builder = GraphBuilder::new()
        .add_node(NodeKind::Start, NoopNode)
        .add_node(NodeKind::End, NoopNode)
        .add_node(custom("a"), NoopNode);

    assert_eq!(builder.nodes.len(), 1);
    assert!(builder.nodes.contains_key(&custom("a")));
}
