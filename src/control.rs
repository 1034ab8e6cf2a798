//! Control primitives callers use to steer a paused or running thread.
//!
//! [`Command`] drives resumption of a paused thread; [`StopSignal`] requests
//! cooperative cancellation, checked by the run loop between nodes only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::interrupts::ResumeValue;
use crate::types::NodeKind;

/// Instruction for a paused thread.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Answer the pending interrupt (and any further interrupts the node
    /// issues during replay, in order) and continue execution.
    Resume(Vec<ResumeValue>),
    /// Jump to a node without consuming the pending interrupt.
    /// Only [`NodeKind::End`] is supported: force-terminate the run.
    Goto(NodeKind),
}

impl Command {
    /// Resume with a single value.
    #[must_use]
    pub fn resume(value: ResumeValue) -> Self {
        Command::Resume(vec![value])
    }

    /// Resume with several values, consumed in order during replay.
    #[must_use]
    pub fn resume_many(values: Vec<ResumeValue>) -> Self {
        Command::Resume(values)
    }

    /// Force-terminate the paused thread.
    #[must_use]
    pub fn goto_end() -> Self {
        Command::Goto(NodeKind::End)
    }
}

/// Cooperative cancellation flag shared between a caller and a run loop.
///
/// The run loop checks the flag between nodes only: a node that is already
/// executing finishes and its update is merged, so state is left exactly as
/// of the last completed node.
///
/// ```
/// use threadloom::control::StopSignal;
///
/// let signal = StopSignal::new();
/// let handle = signal.clone();
/// assert!(!signal.is_stopped());
/// handle.stop();
/// assert!(signal.is_stopped());
/// ```
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// Creates a signal in the running (not stopped) position.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Reset to the running position (e.g. before re-running a stopped
    /// thread).
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
