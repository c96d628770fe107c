//! The decision engine: transport-agnostic operation surface.
//!
//! [`ScriptEngine`] ties the other modules together. It resolves scripts and
//! versions through a [`ScriptStore`], walks version graphs with the rule
//! evaluator, serializes run mutation through [`RunLocks`], hands side
//! effects to an [`ActionDispatcher`], and reports lifecycle transitions on
//! an [`AuditBus`].
//!
//! Every tenant-scoped call takes an explicit [`EngineContext`]; the engine
//! keeps no ambient tenant or user state.
//!
//! ## Operations
//!
//! Authoring: [`create_script`](ScriptEngine::create_script),
//! [`create_draft`](ScriptEngine::create_draft),
//! [`publish`](ScriptEngine::publish).
//!
//! Execution: [`start`](ScriptEngine::start),
//! [`answer`](ScriptEngine::answer), [`advance`](ScriptEngine::advance).
//!
//! Reads: [`get_active_script`](ScriptEngine::get_active_script),
//! [`get_run`](ScriptEngine::get_run),
//! [`answer_history`](ScriptEngine::answer_history).
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use scriptflow::engine::{EngineContext, ScriptEngine};
//! use scriptflow::graph::VersionBuilder;
//! use scriptflow::store::MemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ScriptEngine::new(Arc::new(MemoryStore::new()));
//! let ctx = EngineContext::new("acme").with_user("u-1");
//!
//! let script = engine.create_script(&ctx, "onboarding").await?;
//! let graph = VersionBuilder::new()
//!     .start("s0")
//!     .end("done")
//!     .edge("s0", "done")
//!     .build();
//! let draft = engine.create_draft(&ctx, script.id, graph).await?;
//! engine.publish(&ctx, script.id, draft.version).await?;
//!
//! let run = engine.start(&ctx, "onboarding", "crm", "contact", "c-1").await?;
//! let run = engine.advance(run.id).await?;
//! assert!(run.is_completed());
//! # engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::audit::{AuditBus, AuditEvent};
use crate::config::{EngineConfig, StoreType};
use crate::dispatch::{ActionCall, ActionDispatcher, NullDispatcher};
use crate::error::{EngineError, EngineResult};
use crate::graph::{GraphDefinition, GraphError, VersionGraph};
use crate::model::{Answer, NodeKind, Run, Script, ScriptVersion};
use crate::rules::{decide_choice, decide_edges};
use crate::store::{MemoryStore, ScriptStore, StoreError};
#[cfg(feature = "sqlite")]
use crate::store::SqliteStore;

mod context;
mod locks;

pub use context::EngineContext;
pub use locks::RunLocks;

/// The versioned script/flow decision engine.
///
/// Cheap to share behind an `Arc`; all operations take `&self`.
pub struct ScriptEngine {
    store: Arc<dyn ScriptStore>,
    dispatcher: Arc<dyn ActionDispatcher>,
    audit: AuditBus,
    audit_tx: flume::Sender<AuditEvent>,
    run_locks: RunLocks,
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("run_locks", &self.run_locks.len())
            .finish()
    }
}

impl ScriptEngine {
    /// Engine over the given store, with no-op dispatch and a stdout audit
    /// bus. Use the builder methods to swap either in.
    pub fn new(store: Arc<dyn ScriptStore>) -> Self {
        let audit = AuditBus::default();
        audit.listen();
        let audit_tx = audit.sender();
        Self {
            store,
            dispatcher: Arc::new(NullDispatcher),
            audit,
            audit_tx,
            run_locks: RunLocks::new(),
        }
    }

    /// Replace the action dispatcher.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn ActionDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Replace the audit bus; its listener is started here.
    #[must_use]
    pub fn with_audit_bus(mut self, bus: AuditBus) -> Self {
        bus.listen();
        self.audit_tx = bus.sender();
        self.audit = bus;
        self
    }

    /// Build an engine from declarative configuration.
    pub async fn from_config(config: EngineConfig) -> EngineResult<Self> {
        let store: Arc<dyn ScriptStore> = match config.store {
            StoreType::Memory => Arc::new(MemoryStore::new()),
            #[cfg(feature = "sqlite")]
            StoreType::Sqlite => {
                let url = config.sqlite_url().ok_or_else(|| {
                    EngineError::Store(StoreError::Backend {
                        message: "no SQLite database name resolved".to_string(),
                    })
                })?;
                Arc::new(SqliteStore::connect(&url).await?)
            }
        };
        Ok(Self::new(store).with_audit_bus(config.audit.build_bus()))
    }

    /// Flush queued audit events and stop the background listener.
    pub async fn shutdown(&self) {
        self.audit.stop().await;
    }

    /// Best-effort audit emission; a dropped event never fails an operation.
    fn emit(&self, event: AuditEvent) {
        if let Err(e) = self.audit_tx.send(event) {
            tracing::warn!(error = %e, "audit event dropped");
        }
    }

    async fn require_run(&self, run_id: Uuid) -> EngineResult<Run> {
        self.store
            .run_by_id(run_id)
            .await?
            .ok_or(EngineError::RunNotFound { run_id })
    }

    /// The version a run was bound to at start. A missing record here is
    /// data corruption, not a caller mistake.
    async fn bound_version(&self, run: &Run) -> EngineResult<ScriptVersion> {
        match self.store.version_by_id(run.version_id).await? {
            Some(version) => Ok(version),
            None => Err(EngineError::Store(StoreError::Corrupt {
                message: format!(
                    "run {} references missing version {}",
                    run.id, run.version_id
                ),
            })),
        }
    }

    // ---- authoring ----

    /// Create a script container under the caller's tenant.
    #[instrument(skip(self), err)]
    pub async fn create_script(&self, ctx: &EngineContext, key: &str) -> EngineResult<Script> {
        if self
            .store
            .script_by_key(&ctx.tenant_id, key)
            .await?
            .is_some()
        {
            return Err(EngineError::ScriptExists {
                tenant_id: ctx.tenant_id.clone(),
                key: key.to_string(),
            });
        }
        let script = Script::new(ctx.tenant_id.clone(), key);
        self.store.create_script(&script).await?;
        debug!(script_id = %script.id, key, "script created");
        Ok(script)
    }

    /// Create the next DRAFT version of a script from an assembled graph.
    ///
    /// Drafts are deliberately unvalidated so editors can save work in
    /// progress; [`publish`](Self::publish) is the validation gate.
    #[instrument(skip(self, graph), err)]
    pub async fn create_draft(
        &self,
        ctx: &EngineContext,
        script_id: Uuid,
        graph: GraphDefinition,
    ) -> EngineResult<ScriptVersion> {
        let script = self.require_tenant_script(ctx, script_id).await?;
        let next = self
            .store
            .latest_version_number(script.id)
            .await?
            .unwrap_or(0)
            + 1;
        let version = ScriptVersion::draft(
            script.id,
            next,
            graph.entry_node_id,
            graph.nodes,
            graph.edges,
        );
        self.store.create_version(&version).await?;
        debug!(script_id = %script_id, version = next, "draft created");
        Ok(version)
    }

    /// Make `version` the script's single ACTIVE version.
    ///
    /// The target graph is validated first; a broken definition fails
    /// without touching the lifecycle. Retire-then-activate is atomic in
    /// the store.
    #[instrument(skip(self), err)]
    pub async fn publish(
        &self,
        ctx: &EngineContext,
        script_id: Uuid,
        version: i32,
    ) -> EngineResult<ScriptVersion> {
        let script = self.require_tenant_script(ctx, script_id).await?;
        let target = self
            .store
            .version_by_number(script.id, version)
            .await?
            .ok_or(EngineError::VersionNotFound { script_id, version })?;
        VersionGraph::new(&target).validate()?;
        let activated = self
            .store
            .publish_version(script.id, version, Utc::now())
            .await?
            .ok_or(EngineError::VersionNotFound { script_id, version })?;
        info!(script_id = %script_id, version, "version published");
        self.emit(AuditEvent::version_published(
            ctx.user_id.clone(),
            script_id,
            &activated,
        ));
        Ok(activated)
    }

    // ---- resolution ----

    /// The script with `key` and its ACTIVE version.
    #[instrument(skip(self), err)]
    pub async fn get_active_script(
        &self,
        ctx: &EngineContext,
        key: &str,
    ) -> EngineResult<(Script, ScriptVersion)> {
        let script = self
            .store
            .script_by_key(&ctx.tenant_id, key)
            .await?
            .ok_or_else(|| EngineError::ScriptNotFound {
                tenant_id: ctx.tenant_id.clone(),
                key: key.to_string(),
            })?;
        let version = self
            .store
            .active_version(script.id)
            .await?
            .ok_or(EngineError::NoActiveVersion {
                script_id: script.id,
            })?;
        Ok((script, version))
    }

    // ---- run lifecycle ----

    /// Start a run of the script's ACTIVE version against a subject record.
    ///
    /// The run binds to that version for its whole life; later publishes
    /// never migrate it. The cursor begins at the entry node's key.
    #[instrument(skip(self), err)]
    pub async fn start(
        &self,
        ctx: &EngineContext,
        key: &str,
        subject_schema: &str,
        subject_model: &str,
        subject_id: &str,
    ) -> EngineResult<Run> {
        let (script, version) = self.get_active_script(ctx, key).await?;
        let graph = VersionGraph::new(&version);
        let entry = graph.entry_node()?;
        let run = Run::new(
            ctx.tenant_id.clone(),
            script.id,
            version.id,
            subject_schema,
            subject_model,
            subject_id,
            ctx.user_id.clone(),
            entry.key.clone(),
        );
        self.store.insert_run(&run).await?;
        debug!(run_id = %run.id, cursor = %run.state.cursor, "run started");
        self.emit(AuditEvent::run_started(&run));
        Ok(run)
    }

    /// Record an answer for a QUESTION node.
    ///
    /// Appends to the immutable answer log and overwrites the run's
    /// variable bag entry (last write wins).
    #[instrument(skip(self, value), err)]
    pub async fn answer(
        &self,
        run_id: Uuid,
        node_key: &str,
        value: Value,
    ) -> EngineResult<Answer> {
        let _guard = self.run_locks.acquire(run_id).await;
        let mut run = self.require_run(run_id).await?;
        if run.is_completed() {
            return Err(EngineError::RunCompleted { run_id });
        }
        let version = self.bound_version(&run).await?;
        let graph = VersionGraph::new(&version);
        let node = graph
            .node_by_key(node_key)
            .ok_or_else(|| EngineError::UnknownNodeKey {
                node_key: node_key.to_string(),
            })?;
        if node.kind != NodeKind::Question {
            return Err(EngineError::NotAQuestion {
                node_key: node_key.to_string(),
                kind: node.kind.to_string(),
            });
        }
        let answer = Answer::new(run_id, node_key, value.clone());
        self.store.append_answer(&answer).await?;
        run.set_answer(node_key, value);
        self.store.update_run(&run).await?;
        debug!(run_id = %run_id, node_key, "answer recorded");
        Ok(answer)
    }

    /// Move the run's cursor one step along the graph.
    ///
    /// Routing follows the cursor node's kind: CHOICE nodes evaluate their
    /// grouped rules, every other kind walks outgoing edge conditions.
    /// Landing on ACTION dispatches the side effect before the new cursor
    /// is persisted; landing on END completes the run.
    #[instrument(skip(self), err)]
    pub async fn advance(&self, run_id: Uuid) -> EngineResult<Run> {
        let guard = self.run_locks.acquire(run_id).await;
        let result = self.advance_locked(run_id).await;
        drop(guard);
        if let Ok(run) = &result {
            if run.is_completed() {
                self.run_locks.prune(run_id);
            }
        }
        result
    }

    async fn advance_locked(&self, run_id: Uuid) -> EngineResult<Run> {
        let mut run = self.require_run(run_id).await?;
        if run.is_completed() {
            return Err(EngineError::RunCompleted { run_id });
        }
        let version = self.bound_version(&run).await?;
        let graph = VersionGraph::new(&version);

        let current =
            graph
                .node_by_key(&run.state.cursor)
                .ok_or_else(|| EngineError::InvalidCursor {
                    cursor: run.state.cursor.clone(),
                })?;

        let decision = if current.kind == NodeKind::Choice {
            let config = current.choice_config().map_err(|e| {
                GraphError::InvalidChoiceConfig {
                    node_id: current.id.clone(),
                    message: e.to_string(),
                }
            })?;
            decide_choice(&config, &run.state.answers)
        } else {
            decide_edges(graph.outgoing_edges(&current.id), &run.state.answers)
        };
        let Some(target_id) = decision.target else {
            return Err(EngineError::NoTransition {
                node_key: run.state.cursor.clone(),
            });
        };
        let target = graph
            .node_by_id(&target_id)
            .ok_or(EngineError::TargetNotFound { node_id: target_id })?;
        debug!(
            run_id = %run_id,
            from = %run.state.cursor,
            to = %target.key,
            kind = %target.kind,
            "cursor transition"
        );

        if target.kind == NodeKind::Action {
            let config = target
                .action_config()
                .ok_or_else(|| EngineError::MissingAction {
                    node_key: target.key.clone(),
                })?;
            let call = ActionCall {
                action: config.action.clone(),
                tenant_id: run.tenant_id.clone(),
                run_id: run.id,
                user_id: run.started_by.clone(),
                args: config.args,
            };
            // Dispatch before the cursor is persisted; a failing side
            // effect must leave the run where it was.
            let result = self.dispatcher.dispatch(call).await?;
            debug!(run_id = %run_id, action = %config.action, "action dispatched");
            self.emit(AuditEvent::action_dispatched(&run, &config.action, &result));
        }

        run.state.cursor = target.key.clone();
        let completed = target.kind == NodeKind::End;
        if completed {
            run.complete(Utc::now());
        }
        self.store.update_run(&run).await?;
        if completed {
            info!(run_id = %run_id, "run completed");
            self.emit(AuditEvent::run_completed(&run));
        }
        Ok(run)
    }

    // ---- reads ----

    /// The persisted run record.
    pub async fn get_run(&self, run_id: Uuid) -> EngineResult<Run> {
        self.require_run(run_id).await
    }

    /// The append-only answer log for a run, oldest first.
    pub async fn answer_history(&self, run_id: Uuid) -> EngineResult<Vec<Answer>> {
        self.require_run(run_id).await?;
        Ok(self.store.answers_for_run(run_id).await?)
    }

    async fn require_tenant_script(
        &self,
        ctx: &EngineContext,
        script_id: Uuid,
    ) -> EngineResult<Script> {
        // A script outside the caller's tenant is reported exactly like a
        // missing one.
        match self.store.script_by_id(script_id).await? {
            Some(script) if script.tenant_id == ctx.tenant_id => Ok(script),
            _ => Err(EngineError::ScriptNotFound {
                tenant_id: ctx.tenant_id.clone(),
                key: script_id.to_string(),
            }),
        }
    }
}
