//! Workflow runtime infrastructure: thread orchestration and persistence.
//!
//! This module provides the runtime components for executing workflows with
//! support for checkpointing, thread management, interrupt/resume, and
//! cooperative cancellation. The runtime layer abstracts over different
//! persistence backends while keeping a consistent execution API.
//!
//! # Architecture
//!
//! - **[`ThreadRunner`]** - Strictly sequential orchestrator for thread
//!   execution
//! - **[`Checkpointer`]** - Trait for pluggable state persistence
//! - **[`ThreadState`]** - In-memory representation of a thread between runs
//! - **Persistence Models** - Serde-friendly types for state serialization
//!
//! # Persistence Backends
//!
//! - **[`InMemoryCheckpointer`]** - Volatile storage for testing and
//!   development
//! - **[`SQLiteCheckpointer`]** - Durable SQLite-backed persistence (behind
//!   the `sqlite` feature)
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use threadloom::runtimes::{CheckpointerType, ThreadRunner};
//! use threadloom::state::VersionedState;
//! # use threadloom::app::App;
//! # async fn example(app: App) -> Result<(), Box<dyn std::error::Error>> {
//! let mut runner = ThreadRunner::with_options(app, CheckpointerType::InMemory, true).await;
//! let initial_state = VersionedState::new_with_user_message("Hello");
//!
//! runner.create_thread("thread-1".to_string(), initial_state).await?;
//! let outcome = runner.run("thread-1").await?;
//! # Ok(())
//! # }
//! ```

pub mod checkpointer;
#[cfg(feature = "sqlite")]
pub mod checkpointer_sqlite;
pub mod persistence;
pub mod runner;
pub mod runtime_config;

pub use checkpointer::{
    restore_thread_state, Checkpoint, Checkpointer, CheckpointerError, CheckpointerType,
    InMemoryCheckpointer,
};
#[cfg(feature = "sqlite")]
pub use checkpointer_sqlite::SQLiteCheckpointer;
pub use persistence::{
    PersistedCheckpoint, PersistedMapChannel, PersistedState, PersistedVecChannel,
    PersistenceError,
};
pub use runner::{RoutingError, RunOutcome, RunnerError, ThreadInit, ThreadRunner, ThreadState};
pub use runtime_config::{EventBusConfig, RuntimeConfig, SinkConfig};
