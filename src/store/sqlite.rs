/*!
SQLite Script Store

Async [`ScriptStore`] implementation backed by sqlx. Durable storage for
scripts, versions, runs, and answers.

## Behavior

- Node/edge lists and run state are stored as JSON text columns; the domain
  model (see `crate::model`) is the single serialization authority.
- When the `sqlite-migrations` feature is enabled (default), embedded
  migrations (`sqlx::migrate!("./migrations")`) are executed on connect;
  disabling the feature assumes external migration orchestration.
- `publish_version` runs its retire/activate pair inside one transaction. A
  partial unique index on `(script_id) WHERE status = 'ACTIVE'` backs the
  single-active invariant at the schema level.

## Database Schema

Domain records map to tables as follows:

- `scripts` ← [`Script`] (tenant-scoped key, unique per tenant)
- `script_versions` ← [`ScriptVersion`] with `nodes_json` / `edges_json`
- `runs` ← [`Run`] with `state_json` (cursor plus collected answers)
- `answers` ← [`Answer`], append-only, ordered by insertion

Identifiers are stored as UUID text; timestamps as RFC 3339 text.
*/

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::instrument;
use uuid::Uuid;

use super::{ScriptStore, StoreError, StoreResult};
use crate::model::{Answer, Node, Run, RunState, Script, ScriptVersion, VersionStatus};

/// SQLite-backed script store.
///
/// Holds a shared connection pool; safe for concurrent use from many tasks.
pub struct SqliteStore {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish()
    }
}

impl SqliteStore {
    /// Connect (or create) a SQLite database at `database_url`.
    /// Example URL: "sqlite://scriptflow.db?mode=rwc"
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("connect error: {e}"),
            })?;
        // Run embedded migrations only if the feature is enabled (idempotent).
        #[cfg(feature = "sqlite-migrations")]
        {
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                return Err(StoreError::Backend {
                    message: format!("migration failure: {e}"),
                });
            }
        }
        #[cfg(not(feature = "sqlite-migrations"))]
        {
            // Feature disabled: assume external migration orchestration already applied schema.
        }
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

/// Map an insert error, surfacing uniqueness violations as conflicts so the
/// memory and SQLite backends fail the same way.
fn map_insert_err(context: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return StoreError::Conflict {
                message: format!("{context}: {db}"),
            };
        }
    }
    StoreError::Backend {
        message: format!("{context}: {e}"),
    }
}

fn parse_uuid(field: &str, raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt {
        message: format!("{field} is not a UUID: {e}"),
    })
}

fn parse_ts(field: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            message: format!("{field} is not an RFC 3339 timestamp: {e}"),
        })
}

fn parse_opt_ts(field: &str, raw: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(field, &s)).transpose()
}

fn row_to_script(row: &SqliteRow) -> StoreResult<Script> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");
    Ok(Script {
        id: parse_uuid("scripts.id", &id)?,
        tenant_id: row.get("tenant_id"),
        key: row.get("key"),
        created_at: parse_ts("scripts.created_at", &created_at)?,
    })
}

fn row_to_version(row: &SqliteRow) -> StoreResult<ScriptVersion> {
    let id: String = row.get("id");
    let script_id: String = row.get("script_id");
    let status: String = row.get("status");
    let nodes_json: String = row.get("nodes_json");
    let edges_json: String = row.get("edges_json");
    let published_at: Option<String> =
        row.try_get("published_at")
            .map_err(|e| StoreError::Backend {
                message: format!("published_at read: {e}"),
            })?;
    let created_at: String = row.get("created_at");

    Ok(ScriptVersion {
        id: parse_uuid("script_versions.id", &id)?,
        script_id: parse_uuid("script_versions.script_id", &script_id)?,
        version: row.get("version"),
        status: VersionStatus::decode(&status).ok_or_else(|| StoreError::Corrupt {
            message: format!("unknown version status '{status}'"),
        })?,
        entry_node_id: row.get("entry_node_id"),
        nodes: serde_json::from_str::<Vec<Node>>(&nodes_json)?,
        edges: serde_json::from_str(&edges_json)?,
        published_at: parse_opt_ts("script_versions.published_at", published_at)?,
        created_at: parse_ts("script_versions.created_at", &created_at)?,
    })
}

fn row_to_run(row: &SqliteRow) -> StoreResult<Run> {
    let id: String = row.get("id");
    let script_id: String = row.get("script_id");
    let version_id: String = row.get("version_id");
    let state_json: String = row.get("state_json");
    let started_by: Option<String> = row.try_get("started_by").map_err(|e| StoreError::Backend {
        message: format!("started_by read: {e}"),
    })?;
    let started_at: String = row.get("started_at");
    let completed_at: Option<String> =
        row.try_get("completed_at")
            .map_err(|e| StoreError::Backend {
                message: format!("completed_at read: {e}"),
            })?;

    Ok(Run {
        id: parse_uuid("runs.id", &id)?,
        tenant_id: row.get("tenant_id"),
        script_id: parse_uuid("runs.script_id", &script_id)?,
        version_id: parse_uuid("runs.version_id", &version_id)?,
        subject_schema: row.get("subject_schema"),
        subject_model: row.get("subject_model"),
        subject_id: row.get("subject_id"),
        state: serde_json::from_str::<RunState>(&state_json)?,
        started_by,
        started_at: parse_ts("runs.started_at", &started_at)?,
        completed_at: parse_opt_ts("runs.completed_at", completed_at)?,
    })
}

fn row_to_answer(row: &SqliteRow) -> StoreResult<Answer> {
    let id: String = row.get("id");
    let run_id: String = row.get("run_id");
    let value_json: String = row.get("value_json");
    let created_at: String = row.get("created_at");
    Ok(Answer {
        id: parse_uuid("answers.id", &id)?,
        run_id: parse_uuid("answers.run_id", &run_id)?,
        node_key: row.get("node_key"),
        value: serde_json::from_str(&value_json)?,
        created_at: parse_ts("answers.created_at", &created_at)?,
    })
}

const VERSION_COLUMNS: &str = r#"
    id, script_id, version, status, entry_node_id,
    nodes_json, edges_json, published_at, created_at
"#;

#[async_trait]
impl ScriptStore for SqliteStore {
    #[instrument(skip(self, script), err)]
    async fn create_script(&self, script: &Script) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scripts (id, tenant_id, key, created_at)
            VALUES (?1, ?2, ?3, ?4)
        "#,
        )
        .bind(script.id.to_string())
        .bind(&script.tenant_id)
        .bind(&script.key)
        .bind(script.created_at.to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_insert_err("insert script", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn script_by_id(&self, id: Uuid) -> StoreResult<Option<Script>> {
        let row: Option<SqliteRow> = sqlx::query(
            r#"
            SELECT id, tenant_id, key, created_at
            FROM scripts
            WHERE id = ?1
        "#,
        )
        .bind(id.to_string())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("select script: {e}"),
        })?;
        row.as_ref().map(row_to_script).transpose()
    }

    #[instrument(skip(self), err)]
    async fn script_by_key(&self, tenant_id: &str, key: &str) -> StoreResult<Option<Script>> {
        let row: Option<SqliteRow> = sqlx::query(
            r#"
            SELECT id, tenant_id, key, created_at
            FROM scripts
            WHERE tenant_id = ?1 AND key = ?2
        "#,
        )
        .bind(tenant_id)
        .bind(key)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("select script by key: {e}"),
        })?;
        row.as_ref().map(row_to_script).transpose()
    }

    #[instrument(skip(self, version), err)]
    async fn create_version(&self, version: &ScriptVersion) -> StoreResult<()> {
        let nodes_json = serde_json::to_string(&version.nodes)?;
        let edges_json = serde_json::to_string(&version.edges)?;
        sqlx::query(
            r#"
            INSERT INTO script_versions (
                id, script_id, version, status, entry_node_id,
                nodes_json, edges_json, published_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        )
        .bind(version.id.to_string())
        .bind(version.script_id.to_string())
        .bind(version.version)
        .bind(version.status.encode())
        .bind(&version.entry_node_id)
        .bind(&nodes_json)
        .bind(&edges_json)
        .bind(version.published_at.map(|t| t.to_rfc3339()))
        .bind(version.created_at.to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_insert_err("insert version", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn version_by_id(&self, id: Uuid) -> StoreResult<Option<ScriptVersion>> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM script_versions WHERE id = ?1"
        );
        let row: Option<SqliteRow> = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("select version: {e}"),
            })?;
        row.as_ref().map(row_to_version).transpose()
    }

    #[instrument(skip(self), err)]
    async fn version_by_number(
        &self,
        script_id: Uuid,
        version: i32,
    ) -> StoreResult<Option<ScriptVersion>> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM script_versions WHERE script_id = ?1 AND version = ?2"
        );
        let row: Option<SqliteRow> = sqlx::query(&sql)
            .bind(script_id.to_string())
            .bind(version)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("select version by number: {e}"),
            })?;
        row.as_ref().map(row_to_version).transpose()
    }

    #[instrument(skip(self), err)]
    async fn active_version(&self, script_id: Uuid) -> StoreResult<Option<ScriptVersion>> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM script_versions WHERE script_id = ?1 AND status = ?2"
        );
        let row: Option<SqliteRow> = sqlx::query(&sql)
            .bind(script_id.to_string())
            .bind(VersionStatus::Active.encode())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("select active version: {e}"),
            })?;
        row.as_ref().map(row_to_version).transpose()
    }

    #[instrument(skip(self), err)]
    async fn latest_version_number(&self, script_id: Uuid) -> StoreResult<Option<i32>> {
        let row: SqliteRow = sqlx::query(
            r#"
            SELECT MAX(version) AS latest
            FROM script_versions
            WHERE script_id = ?1
        "#,
        )
        .bind(script_id.to_string())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("select latest version: {e}"),
        })?;
        let latest: Option<i32> = row.get("latest");
        Ok(latest)
    }

    #[instrument(skip(self), err)]
    async fn publish_version(
        &self,
        script_id: Uuid,
        version: i32,
        published_at: DateTime<Utc>,
    ) -> StoreResult<Option<ScriptVersion>> {
        let mut tx = self.pool.begin().await.map_err(|e| StoreError::Backend {
            message: format!("tx begin: {e}"),
        })?;

        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM script_versions WHERE script_id = ?1 AND version = ?2"
        );
        let row: Option<SqliteRow> = sqlx::query(&sql)
            .bind(script_id.to_string())
            .bind(version)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("select publish target: {e}"),
            })?;
        let Some(row) = row else {
            // Dropping the transaction rolls it back.
            return Ok(None);
        };
        let mut target = row_to_version(&row)?;

        // Retire first so the partial unique index never sees two ACTIVE
        // rows for the same script.
        sqlx::query(
            r#"
            UPDATE script_versions
            SET status = 'RETIRED'
            WHERE script_id = ?1 AND status = 'ACTIVE' AND id <> ?2
        "#,
        )
        .bind(script_id.to_string())
        .bind(target.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("retire active version: {e}"),
        })?;

        sqlx::query(
            r#"
            UPDATE script_versions
            SET status = 'ACTIVE', published_at = ?2
            WHERE id = ?1
        "#,
        )
        .bind(target.id.to_string())
        .bind(published_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("activate version: {e}"),
        })?;

        tx.commit().await.map_err(|e| StoreError::Backend {
            message: format!("tx commit: {e}"),
        })?;

        target.status = VersionStatus::Active;
        target.published_at = Some(published_at);
        Ok(Some(target))
    }

    #[instrument(skip(self, run), err)]
    async fn insert_run(&self, run: &Run) -> StoreResult<()> {
        let state_json = serde_json::to_string(&run.state)?;
        sqlx::query(
            r#"
            INSERT INTO runs (
                id, tenant_id, script_id, version_id,
                subject_schema, subject_model, subject_id,
                state_json, started_by, started_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        )
        .bind(run.id.to_string())
        .bind(&run.tenant_id)
        .bind(run.script_id.to_string())
        .bind(run.version_id.to_string())
        .bind(&run.subject_schema)
        .bind(&run.subject_model)
        .bind(&run.subject_id)
        .bind(&state_json)
        .bind(run.started_by.as_deref())
        .bind(run.started_at.to_rfc3339())
        .bind(run.completed_at.map(|t| t.to_rfc3339()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_insert_err("insert run", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn run_by_id(&self, id: Uuid) -> StoreResult<Option<Run>> {
        let row: Option<SqliteRow> = sqlx::query(
            r#"
            SELECT
                id, tenant_id, script_id, version_id,
                subject_schema, subject_model, subject_id,
                state_json, started_by, started_at, completed_at
            FROM runs
            WHERE id = ?1
        "#,
        )
        .bind(id.to_string())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("select run: {e}"),
        })?;
        row.as_ref().map(row_to_run).transpose()
    }

    #[instrument(skip(self, run), err)]
    async fn update_run(&self, run: &Run) -> StoreResult<()> {
        let state_json = serde_json::to_string(&run.state)?;
        let result = sqlx::query(
            r#"
            UPDATE runs
            SET state_json = ?2, completed_at = ?3
            WHERE id = ?1
        "#,
        )
        .bind(run.id.to_string())
        .bind(&state_json)
        .bind(run.completed_at.map(|t| t.to_rfc3339()))
        .execute(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("update run: {e}"),
        })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt {
                message: format!("update for unknown run {}", run.id),
            });
        }
        Ok(())
    }

    #[instrument(skip(self, answer), err)]
    async fn append_answer(&self, answer: &Answer) -> StoreResult<()> {
        let value_json = serde_json::to_string(&answer.value)?;
        sqlx::query(
            r#"
            INSERT INTO answers (id, run_id, node_key, value_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        )
        .bind(answer.id.to_string())
        .bind(answer.run_id.to_string())
        .bind(&answer.node_key)
        .bind(&value_json)
        .bind(answer.created_at.to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_insert_err("insert answer", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn answers_for_run(&self, run_id: Uuid) -> StoreResult<Vec<Answer>> {
        let rows: Vec<SqliteRow> = sqlx::query(
            r#"
            SELECT id, run_id, node_key, value_json, created_at
            FROM answers
            WHERE run_id = ?1
            ORDER BY created_at ASC, rowid ASC
        "#,
        )
        .bind(run_id.to_string())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("select answers: {e}"),
        })?;
        rows.iter().map(row_to_answer).collect()
    }
}
