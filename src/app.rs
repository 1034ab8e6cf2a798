//! Compiled workflow application.
//!
//! An [`App`] is the validated, immutable form of a graph definition: the
//! node registry, the edge tables, and the reducer registry. It owns the
//! update barrier ([`apply_update`](App::apply_update)) and the routing
//! decision ([`next_node`](App::next_node)); thread lifecycle (run, pause,
//! resume, checkpoint) lives in [`ThreadRunner`](crate::runtimes::ThreadRunner).

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::channels::Channel;
use crate::control::Command;
use crate::graphs::ConditionalEdge;
use crate::node::{Node, NodePartial};
use crate::reducers::{ReducerRegistry, SchemaError};
use crate::runtimes::{RoutingError, RunOutcome, RunnerError, RuntimeConfig, ThreadRunner};
use crate::state::VersionedState;
use crate::types::{ChannelType, NodeKind};

/// Executable workflow graph produced by
/// [`GraphBuilder::compile`](crate::graphs::GraphBuilder::compile).
///
/// Cheap to clone into an `Arc` and share across runners.
#[derive(Clone)]
pub struct App {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, NodeKind>,
    conditional_edges: FxHashMap<NodeKind, ConditionalEdge>,
    reducers: ReducerRegistry,
    runtime_config: RuntimeConfig,
}

impl App {
    /// Assembles an app from validated parts. Called by graph compilation.
    #[must_use]
    pub fn from_parts(
        nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
        edges: FxHashMap<NodeKind, NodeKind>,
        conditional_edges: FxHashMap<NodeKind, ConditionalEdge>,
        runtime_config: RuntimeConfig,
    ) -> Self {
        Self {
            nodes,
            edges,
            conditional_edges,
            reducers: ReducerRegistry::default(),
            runtime_config,
        }
    }

    /// The node registry.
    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<NodeKind, Arc<dyn Node>> {
        &self.nodes
    }

    /// The unconditional edge table (single successor per source).
    #[must_use]
    pub fn edges(&self) -> &FxHashMap<NodeKind, NodeKind> {
        &self.edges
    }

    /// The conditional edge table.
    #[must_use]
    pub fn conditional_edges(&self) -> &FxHashMap<NodeKind, ConditionalEdge> {
        &self.conditional_edges
    }

    /// Runtime configuration carried from the builder.
    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    /// The entry node: the single successor of the virtual Start node.
    ///
    /// Validation guarantees it exists.
    #[must_use]
    pub fn entry(&self) -> &NodeKind {
        self.edges
            .get(&NodeKind::Start)
            .expect("compiled graph has an entry edge")
    }

    /// Merge one partial update into `state` through the reducer registry.
    ///
    /// Returns the channels whose content actually changed, in the fixed
    /// order messages, extra, errors. Untouched channels are preserved
    /// verbatim and keep their versions; changed channels get a version
    /// bump. Retained snapshots are unaffected (they hold deep clones).
    ///
    /// A partial carrying data for an unregistered channel fails with
    /// [`SchemaError`] before anything is merged.
    pub fn apply_update(
        &self,
        state: &mut VersionedState,
        update: &NodePartial,
    ) -> Result<Vec<ChannelType>, SchemaError> {
        let messages_before = state.messages.snapshot();
        let extra_before = state.extra.snapshot();
        let errors_len_before = state.errors.len();

        self.reducers.apply_all(state, update)?;

        let mut updated = Vec::new();
        if state.messages.get() != messages_before.as_slice() {
            state.messages.bump_version();
            updated.push(ChannelType::Messages);
        }
        if *state.extra.get() != extra_before {
            state.extra.bump_version();
            updated.push(ChannelType::Extra);
        }
        if state.errors.len() != errors_len_before {
            state.errors.bump_version();
            updated.push(ChannelType::Errors);
        }
        Ok(updated)
    }

    /// Decide the node that follows `from`, observing `state` through a
    /// fresh snapshot.
    ///
    /// Returns `None` when the successor is the virtual End node. A router
    /// result outside its declared candidate set is a fatal
    /// [`RoutingError`], surfaced before any further node runs.
    pub fn next_node(
        &self,
        from: &NodeKind,
        state: &VersionedState,
    ) -> Result<Option<NodeKind>, RoutingError> {
        let target = if let Some(edge) = self.conditional_edges.get(from) {
            let snapshot = state.snapshot();
            let produced = (edge.router())(&snapshot);
            tracing::debug!(from = %from, produced = %produced, "conditional edge routed");
            if !edge.permits(&produced) {
                return Err(RoutingError {
                    from: from.clone(),
                    produced,
                    candidates: edge.candidates().to_vec(),
                });
            }
            produced
        } else if let Some(to) = self.edges.get(from) {
            to.clone()
        } else {
            // Validation rejects dead ends; treat a stale lookup as End.
            tracing::warn!(from = %from, "no outgoing edge at run time; terminating");
            NodeKind::End
        };

        Ok(if target == NodeKind::End {
            None
        } else {
            Some(target)
        })
    }

    /// Run a fresh thread to its first outcome with default runtime options
    /// (in-memory checkpointing, generated thread id).
    ///
    /// Convenience wrapper over [`ThreadRunner`]; use the runner directly
    /// for resumption, custom event sinks, or durable checkpoints.
    pub async fn invoke(&self, initial_state: VersionedState) -> Result<RunOutcome, RunnerError> {
        let mut runner = ThreadRunner::new(self.clone()).await;
        let thread_id = self
            .runtime_config
            .thread_id
            .clone()
            .unwrap_or_else(|| "default".to_string());
        runner.create_thread(thread_id.clone(), initial_state).await?;
        runner.run(&thread_id).await
    }

    /// Resume a paused thread on a fresh runner bound to this app's
    /// configured checkpointer, delivering `command`.
    ///
    /// Convenience for process-restart scenarios; within one process,
    /// prefer calling [`ThreadRunner::resume`] on the original runner.
    pub async fn resume(
        &self,
        thread_id: &str,
        command: Command,
    ) -> Result<RunOutcome, RunnerError> {
        let mut runner = ThreadRunner::new(self.clone()).await;
        runner.restore_thread(thread_id).await?;
        runner.run(thread_id).await?;
        runner.resume(thread_id, command).await
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field(
                "conditional_edges",
                &self.conditional_edges.keys().collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
