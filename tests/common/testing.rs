use rustc_hash::FxHashMap;
use std::sync::Arc;

use threadloom::event_bus::Event;
use threadloom::interrupts::{ResumeQueue, ResumeValue};
use threadloom::node::NodeContext;

/// Build a node context for direct node invocation in tests.
///
/// Returns the receiver half so the test can assert on emitted events.
pub fn test_ctx(node_id: &str, step: u64) -> (NodeContext, flume::Receiver<Event>) {
    test_ctx_with_resume(node_id, step, Vec::new())
}

/// Like [`test_ctx`] with resume values preloaded for interrupt replay.
pub fn test_ctx_with_resume(
    node_id: &str,
    step: u64,
    resume: Vec<ResumeValue>,
) -> (NodeContext, flume::Receiver<Event>) {
    let (tx, rx) = flume::unbounded();
    let ctx = NodeContext::new(
        node_id.to_string(),
        step,
        tx,
        Arc::new(FxHashMap::default()),
        ResumeQueue::preloaded(resume),
    );
    (ctx, rx)
}
