use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use crate::app::App;
use crate::channels::errors::{ErrorEvent, FaultDetail};
use crate::control::{Command, StopSignal};
use crate::event_bus::{Event, EventBus};
use crate::interrupts::{InterruptRequest, ProtocolError, ResumeQueue};
use crate::node::{NodeContext, NodeError, NodePartial};
use crate::reducers::SchemaError;
use crate::runtimes::checkpointer::{
    restore_thread_state, Checkpoint, Checkpointer, CheckpointerError, CheckpointerType,
    InMemoryCheckpointer,
};
use crate::state::VersionedState;
use crate::types::NodeKind;

/// In-memory execution state of one conversation thread.
///
/// `position` names the node the thread will run next; `None` means the run
/// reached End. `pending_interrupt` is set only while the thread is paused
/// awaiting a resume command in this process; restored threads start without
/// it and re-surface their interrupt by replaying the paused node.
#[derive(Debug, Clone)]
pub struct ThreadState {
    pub state: VersionedState,
    /// Completed node executions.
    pub step: u64,
    /// Last persisted checkpoint sequence.
    pub sequence: u64,
    pub position: Option<NodeKind>,
    pub pending_interrupt: Option<InterruptRequest>,
    /// Queue feeding `NodeContext::interrupt` during replay.
    pub resume: ResumeQueue,
}

/// Indicates how a thread was initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadInit {
    /// A brand new thread was created.
    Fresh,
    /// An existing thread was restored from its latest checkpoint.
    Resumed { checkpoint_sequence: u64 },
}

/// Terminal outcome of one `run` or `resume` call.
///
/// Every variant carries a clone of the thread's state as of the last
/// completed node, so callers can render the transcript without another
/// lookup.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The run reached End.
    Completed(VersionedState),
    /// A node requested external input; the thread is paused and
    /// checkpointed.
    Interrupted {
        request: InterruptRequest,
        state: VersionedState,
    },
    /// The stop signal was raised between nodes.
    Stopped(VersionedState),
}

/// A conditional router chose a node outside its declared candidate set.
///
/// Always fatal: the graph declaration and the router disagree, so no
/// further node runs on this thread.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("router at {from} chose {produced}, which is not a declared candidate")]
#[diagnostic(
    code(threadloom::runner::routing),
    help("Declare every node the router can return in the conditional edge's candidate set.")
)]
pub struct RoutingError {
    pub from: NodeKind,
    pub produced: NodeKind,
    pub candidates: Vec<NodeKind>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("thread not found: {thread_id}")]
    #[diagnostic(code(threadloom::runner::thread_not_found))]
    ThreadNotFound { thread_id: String },

    #[error("checkpoint position {node} is not a node in this graph")]
    #[diagnostic(
        code(threadloom::runner::unknown_position),
        help("The thread was checkpointed by a graph that registered this node; add it back or start a fresh thread.")
    )]
    UnknownPosition { node: NodeKind },

    #[error("node {node} failed")]
    #[diagnostic(code(threadloom::runner::node_failed))]
    NodeFailed {
        node: NodeKind,
        #[source]
        source: NodeError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(code(threadloom::runner::checkpointer))]
    Checkpointer(#[from] CheckpointerError),
}

/// Runtime execution engine: strictly sequential thread orchestration over a
/// compiled [`App`].
///
/// The runner owns the pieces that are per-deployment rather than per-graph:
/// the thread table, the checkpointer, the event bus, and the stop signal.
/// One `App` can back many runners (one per web request, say), each with its
/// own sinks and persistence.
///
/// # Execution model
///
/// A thread runs one node at a time. After each node the runner merges the
/// partial through the barrier, routes to the single next node, checkpoints,
/// and checks the stop signal. Interrupts pause the thread with its position
/// still naming the interrupted node; [`resume`](Self::resume) replays that
/// node with the supplied resume values queued.
///
/// ```rust,no_run
/// # use threadloom::app::App;
/// use threadloom::control::Command;
/// use threadloom::interrupts::ResumeValue;
/// use threadloom::runtimes::{CheckpointerType, RunOutcome, ThreadRunner};
/// use threadloom::state::VersionedState;
/// # async fn example(app: App) -> Result<(), Box<dyn std::error::Error>> {
/// let mut runner = ThreadRunner::with_options(app, CheckpointerType::InMemory, true).await;
/// runner
///     .create_thread("thread-1".into(), VersionedState::new_with_user_message("book it"))
///     .await?;
///
/// match runner.run("thread-1").await? {
///     RunOutcome::Interrupted { request, .. } => {
///         println!("awaiting approval for {}", request.action);
///         runner
///             .resume("thread-1", Command::resume(ResumeValue::Accept))
///             .await?;
///     }
///     RunOutcome::Completed(state) => {
///         println!("{} messages", state.messages.len());
///     }
///     RunOutcome::Stopped(_) => {}
/// }
/// # Ok(())
/// # }
/// ```
pub struct ThreadRunner {
    app: Arc<App>,
    threads: FxHashMap<String, ThreadState>,
    checkpointer: Option<Arc<dyn Checkpointer>>, // optional pluggable persistence
    autosave: bool,
    event_bus: EventBus,
    stop_signal: StopSignal,
}

impl ThreadRunner {
    /// Create a runner from the app's own runtime configuration (its
    /// checkpointer choice and event bus sinks), with autosave on.
    pub async fn new(app: App) -> Self {
        let checkpointer_type = app
            .runtime_config()
            .checkpointer
            .unwrap_or(CheckpointerType::InMemory);
        Self::with_options(app, checkpointer_type, true).await
    }

    /// Create with an explicit checkpointer backend and autosave toggle.
    pub async fn with_options(
        app: App,
        checkpointer_type: CheckpointerType,
        autosave: bool,
    ) -> Self {
        let bus = app.runtime_config().event_bus.build_event_bus();
        Self::with_arc_and_bus(Arc::new(app), checkpointer_type, autosave, bus, true).await
    }

    /// Create with a custom [`EventBus`], for callers that stream events to
    /// their own sinks.
    pub async fn with_options_and_bus(
        app: App,
        checkpointer_type: CheckpointerType,
        autosave: bool,
        event_bus: EventBus,
        start_listener: bool,
    ) -> Self {
        Self::with_arc_and_bus(
            Arc::new(app),
            checkpointer_type,
            autosave,
            event_bus,
            start_listener,
        )
        .await
    }

    /// Variant of [`with_options`](Self::with_options) for an app already in
    /// an `Arc`.
    pub async fn from_arc(app: Arc<App>, checkpointer_type: CheckpointerType) -> Self {
        let bus = app.runtime_config().event_bus.build_event_bus();
        Self::with_arc_and_bus(app, checkpointer_type, true, bus, true).await
    }

    async fn with_arc_and_bus(
        app: Arc<App>,
        checkpointer_type: CheckpointerType,
        autosave: bool,
        event_bus: EventBus,
        start_listener: bool,
    ) -> Self {
        let sqlite_db_name = app.runtime_config().sqlite_db_name.clone();
        let checkpointer = Self::create_checkpointer(checkpointer_type, sqlite_db_name).await;
        if start_listener {
            event_bus.listen_for_events();
        }
        Self {
            app,
            threads: FxHashMap::default(),
            checkpointer,
            autosave,
            event_bus,
            stop_signal: StopSignal::new(),
        }
    }

    async fn create_checkpointer(
        checkpointer_type: CheckpointerType,
        sqlite_db_name: Option<String>,
    ) -> Option<Arc<dyn Checkpointer>> {
        match checkpointer_type {
            CheckpointerType::InMemory => Some(Arc::new(InMemoryCheckpointer::new())),
            #[cfg(feature = "sqlite")]
            CheckpointerType::SQLite => {
                let db_url = std::env::var("THREADLOOM_SQLITE_URL")
                    .ok()
                    .or_else(|| {
                        sqlite_db_name
                            .as_ref()
                            .map(|name| format!("sqlite://{name}"))
                    })
                    .unwrap_or_else(|| {
                        let fallback = std::env::var("SQLITE_DB_NAME")
                            .unwrap_or_else(|_| "threadloom.db".to_string());
                        format!("sqlite://{fallback}")
                    });
                // Ensure the underlying sqlite file exists before sqlx opens it.
                if let Some(path) = db_url.strip_prefix("sqlite://") {
                    let path = path.trim();
                    if !path.is_empty() {
                        let p = std::path::Path::new(path);
                        if let Some(parent) = p.parent() {
                            let _ = std::fs::create_dir_all(parent);
                        }
                        if !p.exists() {
                            let _ = std::fs::File::create_new(p);
                        }
                    }
                }
                match crate::runtimes::SQLiteCheckpointer::connect(&db_url).await {
                    Ok(cp) => Some(Arc::new(cp) as Arc<dyn Checkpointer>),
                    Err(e) => {
                        tracing::error!(
                            url = %db_url,
                            error = %e,
                            "SQLiteCheckpointer initialization failed"
                        );
                        None
                    }
                }
            }
        }
    }

    /// Handle for cooperative cancellation; clone it into whatever task
    /// decides to stop the run. Checked between nodes only.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop_signal.clone()
    }

    /// Initialize a thread with the given initial state.
    ///
    /// If the checkpointer already holds a checkpoint under this id, the
    /// thread is restored from it instead and `initial_state` is discarded.
    #[instrument(skip(self, initial_state, thread_id), err)]
    pub async fn create_thread(
        &mut self,
        thread_id: String,
        initial_state: VersionedState,
    ) -> Result<ThreadInit, RunnerError> {
        let restored_checkpoint = if let Some(cp) = &self.checkpointer {
            cp.load_latest(&thread_id).await?
        } else {
            None
        };

        if let Some(stored) = restored_checkpoint {
            let checkpoint_sequence = stored.sequence;
            self.threads.insert(thread_id, restore_thread_state(&stored));
            return Ok(ThreadInit::Resumed {
                checkpoint_sequence,
            });
        }

        let entry = self.app.entry().clone();
        let thread_state = ThreadState {
            state: initial_state,
            step: 0,
            sequence: 0,
            position: Some(entry),
            pending_interrupt: None,
            resume: ResumeQueue::new(),
        };
        self.threads.insert(thread_id.clone(), thread_state);
        self.checkpoint_now(&thread_id).await;
        Ok(ThreadInit::Fresh)
    }

    /// Restore a thread from its latest checkpoint.
    ///
    /// A restored thread has no pending interrupt recorded; if it was paused,
    /// the next [`run`](Self::run) replays the paused node and re-surfaces
    /// the interrupt.
    #[instrument(skip(self, thread_id), err)]
    pub async fn restore_thread(&mut self, thread_id: &str) -> Result<ThreadInit, RunnerError> {
        let stored = match &self.checkpointer {
            Some(cp) => cp.load_latest(thread_id).await?,
            None => None,
        };
        let stored = stored.ok_or_else(|| RunnerError::ThreadNotFound {
            thread_id: thread_id.to_string(),
        })?;
        let checkpoint_sequence = stored.sequence;
        self.threads
            .insert(thread_id.to_string(), restore_thread_state(&stored));
        Ok(ThreadInit::Resumed {
            checkpoint_sequence,
        })
    }

    /// Run the thread until it completes, pauses on an interrupt, or is
    /// stopped.
    #[instrument(skip(self), err)]
    pub async fn run(&mut self, thread_id: &str) -> Result<RunOutcome, RunnerError> {
        loop {
            let position = self.thread(thread_id)?.position.clone();
            let Some(kind) = position else {
                let _ = self
                    .event_bus
                    .get_sender()
                    .send(Event::diagnostic("runner", format!("thread {thread_id} completed")));
                return Ok(RunOutcome::Completed(self.thread(thread_id)?.state.clone()));
            };

            if self.stop_signal.is_stopped() {
                tracing::info!(thread = %thread_id, node = %kind, "stop signal raised; halting between nodes");
                self.maybe_checkpoint(thread_id).await;
                return Ok(RunOutcome::Stopped(self.thread(thread_id)?.state.clone()));
            }

            let node = self
                .app
                .nodes()
                .get(&kind)
                .cloned()
                .ok_or_else(|| RunnerError::UnknownPosition { node: kind.clone() })?;

            let (snapshot, ctx, step) = {
                let thread = self.thread(thread_id)?;
                let step = thread.step + 1;
                let ctx = NodeContext::new(
                    kind.to_string(),
                    step,
                    self.event_bus.get_sender(),
                    self.app.runtime_config().configurable.clone(),
                    thread.resume.clone(),
                );
                (thread.state.snapshot(), ctx, step)
            };

            tracing::debug!(thread = %thread_id, node = %kind, step, "running node");
            match node.run(snapshot, ctx).await {
                Ok(partial) => {
                    let updated = {
                        let thread =
                            self.threads
                                .get_mut(thread_id)
                                .ok_or_else(|| RunnerError::ThreadNotFound {
                                    thread_id: thread_id.to_string(),
                                })?;
                        thread.step = step;
                        thread.pending_interrupt = None;
                        // Unconsumed resume values do not leak into later nodes.
                        thread.resume.clear();
                        self.app.apply_update(&mut thread.state, &partial)?
                    };
                    let _ = self
                        .event_bus
                        .get_sender()
                        .send(Event::update(kind.to_string(), step, updated));

                    let routed = {
                        let thread = self.thread(thread_id)?;
                        self.app.next_node(&kind, &thread.state)
                    };
                    match routed {
                        Ok(next) => {
                            if let Some(thread) = self.threads.get_mut(thread_id) {
                                thread.position = next;
                            }
                            self.maybe_checkpoint(thread_id).await;
                        }
                        Err(routing) => {
                            self.record_fault(thread_id, step, &routing.to_string())
                                .await;
                            return Err(RunnerError::Routing(routing));
                        }
                    }
                }
                Err(err) => match err.into_interrupt() {
                    Ok(request) => {
                        if let Some(thread) = self.threads.get_mut(thread_id) {
                            thread.pending_interrupt = Some(request.clone());
                        }
                        let _ = self.event_bus.get_sender().send(Event::interrupt(
                            kind.to_string(),
                            step,
                            request.action.clone(),
                        ));
                        self.maybe_checkpoint(thread_id).await;
                        tracing::info!(thread = %thread_id, node = %kind, action = %request.action, "thread paused on interrupt");
                        return Ok(RunOutcome::Interrupted {
                            request,
                            state: self.thread(thread_id)?.state.clone(),
                        });
                    }
                    Err(fatal) => {
                        self.record_fault(thread_id, step, &fatal.to_string()).await;
                        return Err(RunnerError::NodeFailed {
                            node: kind,
                            source: fatal,
                        });
                    }
                },
            }
        }
    }

    /// Deliver a [`Command`] to a paused thread.
    ///
    /// `Resume` requires a pending interrupt and replays the paused node
    /// with the supplied values queued; `Goto(End)` force-terminates without
    /// consuming the interrupt.
    #[instrument(skip(self, command), err)]
    pub async fn resume(
        &mut self,
        thread_id: &str,
        command: Command,
    ) -> Result<RunOutcome, RunnerError> {
        match command {
            Command::Goto(target) => {
                if !target.is_end() {
                    return Err(ProtocolError::UnsupportedGoto {
                        target: target.to_string(),
                    }
                    .into());
                }
                let state = {
                    let thread =
                        self.threads
                            .get_mut(thread_id)
                            .ok_or_else(|| RunnerError::ThreadNotFound {
                                thread_id: thread_id.to_string(),
                            })?;
                    thread.position = None;
                    thread.pending_interrupt = None;
                    thread.resume.clear();
                    thread.state.clone()
                };
                self.maybe_checkpoint(thread_id).await;
                tracing::info!(thread = %thread_id, "thread force-terminated via goto End");
                Ok(RunOutcome::Completed(state))
            }
            Command::Resume(values) => {
                {
                    let thread =
                        self.threads
                            .get_mut(thread_id)
                            .ok_or_else(|| RunnerError::ThreadNotFound {
                                thread_id: thread_id.to_string(),
                            })?;
                    if thread.pending_interrupt.is_none() {
                        return Err(ProtocolError::ResumeWithoutInterrupt {
                            thread_id: thread_id.to_string(),
                        }
                        .into());
                    }
                    if values.is_empty() {
                        return Err(ProtocolError::MalformedResume {
                            detail: "resume command carries no values".to_string(),
                        }
                        .into());
                    }
                    thread.resume = ResumeQueue::preloaded(values);
                    thread.pending_interrupt = None;
                }
                self.run(thread_id).await
            }
        }
    }

    /// Get a snapshot of the current thread state.
    #[must_use]
    pub fn get_thread(&self, thread_id: &str) -> Option<&ThreadState> {
        self.threads.get(thread_id)
    }

    /// List all active thread ids.
    #[must_use]
    pub fn list_threads(&self) -> Vec<&String> {
        self.threads.keys().collect()
    }

    fn thread(&self, thread_id: &str) -> Result<&ThreadState, RunnerError> {
        self.threads
            .get(thread_id)
            .ok_or_else(|| RunnerError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })
    }

    /// Record a fatal runner fault on the errors channel so it survives in
    /// the checkpointed state, then persist.
    async fn record_fault(&mut self, thread_id: &str, step: u64, message: &str) {
        let event = ErrorEvent::runner(thread_id, step, FaultDetail::msg(message))
            .with_tag("runner");
        if let Some(thread) = self.threads.get_mut(thread_id) {
            let partial = NodePartial::new().with_errors(vec![event]);
            if let Err(e) = self.app.apply_update(&mut thread.state, &partial) {
                tracing::warn!(thread = %thread_id, error = %e, "failed to record runner fault");
            }
        }
        self.maybe_checkpoint(thread_id).await;
    }

    /// Persist a checkpoint for the thread, bumping its sequence.
    async fn checkpoint_now(&mut self, thread_id: &str) {
        let Some(checkpointer) = &self.checkpointer else {
            return;
        };
        if let Some(thread) = self.threads.get_mut(thread_id) {
            thread.sequence += 1;
            if let Err(e) = checkpointer
                .save(Checkpoint::from_thread(thread_id, thread))
                .await
            {
                tracing::warn!(thread = %thread_id, error = %e, "checkpoint save failed");
            }
        }
    }

    /// Checkpoint only when autosave is enabled.
    async fn maybe_checkpoint(&mut self, thread_id: &str) {
        if self.autosave {
            self.checkpoint_now(thread_id).await;
        }
    }
}
