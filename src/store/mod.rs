/*!
Persistence provider boundary.

The engine needs create/read/update semantics on four record types: Script,
ScriptVersion (whose nodes and edges travel inside the version record), Run,
and Answer. [`ScriptStore`] is that contract; the engine is written against
the trait and never against a concrete backend.

## Implementations

- [`MemoryStore`]: mutex-guarded maps, for tests and DB-less deployments.
- [`SqliteStore`] (feature `sqlite`): sqlx-backed durable storage with JSON
  columns for graph and run state.

## Atomicity

[`publish_version`](ScriptStore::publish_version) is the one compound write:
retire the currently ACTIVE version and activate the target as a single
atomic unit. The SQLite backend wraps the pair in one transaction; the
memory backend holds its lock across both mutations. Either way no caller
can observe zero or two ACTIVE versions for a script.

## Lookup conventions

Lookups return `Ok(None)` for absent records; `Err` is reserved for backend
failures and corrupt rows. The engine translates `None` into its NotFound
error classes.
*/

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Answer, Run, Script, ScriptVersion};

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by persistence providers.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// The backing store failed (connection, constraint, I/O).
    #[error("backend error: {message}")]
    #[diagnostic(
        code(scriptflow::store::backend),
        help("Check that the database is reachable and migrations have run.")
    )]
    Backend { message: String },

    /// A record failed to serialize or deserialize.
    #[error(transparent)]
    #[diagnostic(code(scriptflow::store::serde))]
    Serde(#[from] serde_json::Error),

    /// A stored row holds data the domain model cannot decode.
    #[error("corrupt record: {message}")]
    #[diagnostic(
        code(scriptflow::store::corrupt),
        help("The row predates the current schema or was written by another tool.")
    )]
    Corrupt { message: String },

    /// A uniqueness rule was violated.
    #[error("conflict: {message}")]
    #[diagnostic(code(scriptflow::store::conflict))]
    Conflict { message: String },
}

/// Create/read/update contract the engine persists through.
///
/// All methods are cancel-safe single operations except
/// [`publish_version`](Self::publish_version), which performs the atomic
/// retire-then-activate pair.
#[async_trait]
pub trait ScriptStore: Send + Sync {
    async fn create_script(&self, script: &Script) -> StoreResult<()>;

    async fn script_by_id(&self, id: Uuid) -> StoreResult<Option<Script>>;

    /// Lookup by the tenant-scoped human key.
    async fn script_by_key(&self, tenant_id: &str, key: &str) -> StoreResult<Option<Script>>;

    async fn create_version(&self, version: &ScriptVersion) -> StoreResult<()>;

    async fn version_by_id(&self, id: Uuid) -> StoreResult<Option<ScriptVersion>>;

    async fn version_by_number(
        &self,
        script_id: Uuid,
        version: i32,
    ) -> StoreResult<Option<ScriptVersion>>;

    /// The unique ACTIVE version of a script, when one exists.
    async fn active_version(&self, script_id: Uuid) -> StoreResult<Option<ScriptVersion>>;

    /// Highest version number created for a script.
    async fn latest_version_number(&self, script_id: Uuid) -> StoreResult<Option<i32>>;

    /// Atomically retire the ACTIVE version (if any) and activate the
    /// target, stamping `published_at`. Returns the activated version, or
    /// `None` when no version with that number exists for the script.
    async fn publish_version(
        &self,
        script_id: Uuid,
        version: i32,
        published_at: DateTime<Utc>,
    ) -> StoreResult<Option<ScriptVersion>>;

    async fn insert_run(&self, run: &Run) -> StoreResult<()>;

    async fn run_by_id(&self, id: Uuid) -> StoreResult<Option<Run>>;

    /// Persist the run's current state, completion stamp included.
    async fn update_run(&self, run: &Run) -> StoreResult<()>;

    async fn append_answer(&self, answer: &Answer) -> StoreResult<()>;

    /// Full answer history for a run, oldest first.
    async fn answers_for_run(&self, run_id: Uuid) -> StoreResult<Vec<Answer>>;
}
