//! Checkpoint model and pluggable persistence backends.
//!
//! Every save appends a new checkpoint with a monotonically increasing
//! `sequence`, so a thread's history is an ordered log and recovery always
//! reads the latest entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::interrupts::ResumeQueue;
use crate::runtimes::runner::ThreadState;
use crate::state::VersionedState;
use crate::types::NodeKind;

/// One persisted snapshot of a thread.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub thread_id: String,
    /// Save counter, incremented on every save of this thread.
    pub sequence: u64,
    /// Number of node executions completed so far.
    pub step: u64,
    /// Node the thread will run next; `None` when the run completed.
    pub position: Option<NodeKind>,
    pub state: VersionedState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot a thread's in-memory state for persistence.
    #[must_use]
    pub fn from_thread(thread_id: &str, thread: &ThreadState) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            sequence: thread.sequence,
            step: thread.step,
            position: thread.position.clone(),
            state: thread.state.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Rebuild in-memory thread state from a checkpoint.
///
/// A restored thread never has a pending interrupt recorded: if it was
/// paused, its position still names the paused node and the next run replays
/// that node, re-surfacing the interrupt.
#[must_use]
pub fn restore_thread_state(checkpoint: &Checkpoint) -> ThreadState {
    ThreadState {
        state: checkpoint.state.clone(),
        step: checkpoint.step,
        sequence: checkpoint.sequence,
        position: checkpoint.position.clone(),
        pending_interrupt: None,
        resume: ResumeQueue::new(),
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("checkpoint backend error: {message}")]
    #[diagnostic(code(threadloom::checkpointer::backend))]
    Backend { message: String },

    #[error("checkpointer error: {message}")]
    #[diagnostic(code(threadloom::checkpointer::other))]
    Other { message: String },
}

pub type Result<T> = std::result::Result<T, CheckpointerError>;

/// Pluggable checkpoint persistence.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Append one checkpoint to the thread's log.
    async fn save(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Load the highest-sequence checkpoint for a thread, if any.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// All thread ids with at least one checkpoint.
    async fn list_threads(&self) -> Result<Vec<String>>;
}

/// Which persistence backend a runner should construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointerType {
    InMemory,
    #[cfg(feature = "sqlite")]
    SQLite,
}

/// Volatile checkpoint store for tests and development.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    threads: Arc<Mutex<FxHashMap<String, Vec<Checkpoint>>>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of checkpoints saved for a thread.
    #[must_use]
    pub fn history_len(&self, thread_id: &str) -> usize {
        self.threads
            .lock()
            .expect("checkpoint store poisoned")
            .get(thread_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut threads = self.threads.lock().map_err(|_| CheckpointerError::Other {
            message: "checkpoint store poisoned".to_string(),
        })?;
        threads
            .entry(checkpoint.thread_id.clone())
            .or_default()
            .push(checkpoint);
        Ok(())
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let threads = self.threads.lock().map_err(|_| CheckpointerError::Other {
            message: "checkpoint store poisoned".to_string(),
        })?;
        Ok(threads.get(thread_id).and_then(|history| {
            history
                .iter()
                .max_by_key(|cp| cp.sequence)
                .cloned()
        }))
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let threads = self.threads.lock().map_err(|_| CheckpointerError::Other {
            message: "checkpoint store poisoned".to_string(),
        })?;
        Ok(threads.keys().cloned().collect())
    }
}
