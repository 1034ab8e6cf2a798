/*!
SQLite Checkpointer

Async implementation of the [`Checkpointer`] trait backed by a SQLite
database. Every save appends a row to the checkpoint log keyed by
`(thread_id, sequence)`, so the full history of a thread survives process
restarts and `load_latest` always recovers the newest snapshot.

## Behavior

- Uses serde-based persistence models (see [`super::persistence`]) for
  encoding `VersionedState` and the next-node position.
- Bootstraps its schema on connect with idempotent `CREATE TABLE IF NOT
  EXISTS` statements; no external migration step is required.

## Database Schema

- `threads.id` ← `checkpoint.thread_id`
- `threads.last_sequence` ← latest `checkpoint.sequence`
- `checkpoints.thread_id`, `checkpoints.sequence` ← composite key
- `checkpoints.step` ← completed node executions
- `checkpoints.position` ← encoded next `NodeKind` (NULL when completed)
- `checkpoints.state_json` ← serialized `VersionedState`
- `checkpoints.created_at` ← RFC3339 timestamp
*/

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::instrument;

use crate::{
    runtimes::checkpointer::{Checkpoint, Checkpointer, CheckpointerError, Result},
    runtimes::persistence::PersistedState,
    state::VersionedState,
    types::NodeKind,
};

/// SQLite-backed checkpointer with full per-thread history.
///
/// # Storage Growth
///
/// Storage grows roughly with `(threads × saves_per_thread × state_size)`.
/// For long-running deployments, prune old rows periodically:
///
/// ```bash
/// sqlite3 threadloom.db "DELETE FROM checkpoints WHERE created_at < datetime('now', '-30 days')"
/// sqlite3 threadloom.db "VACUUM"
/// ```
pub struct SQLiteCheckpointer {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SQLiteCheckpointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SQLiteCheckpointer").finish()
    }
}

impl SQLiteCheckpointer {
    /// Connect (or create) a SQLite database at `database_url` and ensure
    /// the schema exists. Example URL: `"sqlite://threadloom.db"`.
    #[must_use = "checkpointer must be used to persist state"]
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> std::result::Result<Self, CheckpointerError> {
        let pool =
            SqlitePool::connect(database_url)
                .await
                .map_err(|e| CheckpointerError::Backend {
                    message: format!("connect error: {e}"),
                })?;

        for statement in [
            r#"
            CREATE TABLE IF NOT EXISTS threads (
                id TEXT PRIMARY KEY,
                last_sequence INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT NOT NULL REFERENCES threads(id),
                sequence INTEGER NOT NULL,
                step INTEGER NOT NULL,
                position TEXT,
                state_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (thread_id, sequence)
            )
            "#,
        ] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| CheckpointerError::Backend {
                    message: format!("schema bootstrap: {e}"),
                })?;
        }

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Load up to `limit` checkpoints for a thread, newest first.
    #[instrument(skip(self), err)]
    pub async fn history(&self, thread_id: &str, limit: u32) -> Result<Vec<Checkpoint>> {
        let limit = limit.min(1000);
        let rows = sqlx::query(
            r#"
            SELECT thread_id, sequence, step, position, state_json, created_at
            FROM checkpoints
            WHERE thread_id = ?1
            ORDER BY sequence DESC
            LIMIT ?2
            "#,
        )
        .bind(thread_id)
        .bind(limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("history query: {e}"),
        })?;

        rows.iter().map(row_to_checkpoint).collect()
    }
}

fn row_to_checkpoint(row: &SqliteRow) -> Result<Checkpoint> {
    let thread_id: String = row.get("thread_id");
    let sequence: i64 = row.get("sequence");
    let step: i64 = row.get("step");
    let position: Option<String> = row.get("position");
    let state_json: String = row.get("state_json");
    let created_at_str: String = row.get("created_at");

    let persisted_state: PersistedState =
        serde_json::from_str(&state_json).map_err(|e| CheckpointerError::Other {
            message: format!("state decode: {e}"),
        })?;
    let state = VersionedState::try_from(persisted_state).map_err(|e| CheckpointerError::Other {
        message: format!("state convert: {e}"),
    })?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Checkpoint {
        thread_id,
        sequence: sequence as u64,
        step: step as u64,
        position: position.as_deref().map(NodeKind::decode),
        state,
        created_at,
    })
}

#[async_trait::async_trait]
impl Checkpointer for SQLiteCheckpointer {
    #[instrument(skip(self, checkpoint), err)]
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let persisted_state = PersistedState::from(&checkpoint.state);
        let state_json =
            serde_json::to_string(&persisted_state).map_err(|e| CheckpointerError::Other {
                message: format!("state encode: {e}"),
            })?;
        let position = checkpoint.position.as_ref().map(NodeKind::encode);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("tx begin: {e}"),
            })?;

        sqlx::query(
            r#"
            INSERT INTO threads (id, last_sequence, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                last_sequence = excluded.last_sequence,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&checkpoint.thread_id)
        .bind(checkpoint.sequence as i64)
        .bind(checkpoint.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("upsert thread: {e}"),
        })?;

        // INSERT OR REPLACE keeps an idempotent re-save of the same sequence.
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO checkpoints (
                thread_id, sequence, step, position, state_json, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&checkpoint.thread_id)
        .bind(checkpoint.sequence as i64)
        .bind(checkpoint.step as i64)
        .bind(&position)
        .bind(&state_json)
        .bind(checkpoint.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("insert checkpoint: {e}"),
        })?;

        tx.commit().await.map_err(|e| CheckpointerError::Backend {
            message: format!("tx commit: {e}"),
        })?;

        Ok(())
    }

    #[instrument(skip(self, thread_id), err)]
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let row_opt: Option<SqliteRow> = sqlx::query(
            r#"
            SELECT thread_id, sequence, step, position, state_json, created_at
            FROM checkpoints
            WHERE thread_id = ?1
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(thread_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("select latest: {e}"),
        })?;

        match row_opt {
            Some(row) => Ok(Some(row_to_checkpoint(&row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), err)]
    async fn list_threads(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM threads
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("list threads: {e}"),
        })?;

        Ok(rows.into_iter().map(|r| r.get::<String, _>("id")).collect())
    }
}
