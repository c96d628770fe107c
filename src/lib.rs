//! # Scriptflow: Versioned Script/Flow Decision Engine
//!
//! Scriptflow executes versioned, directed-graph workflow definitions
//! ("scripts") step by step against accumulated runtime variables, using a
//! small typed rule language to decide branching and dispatching named side
//! effects at designated nodes. It is the decision subsystem of a
//! multi-tenant CRM, written transport-agnostic: callers bring their own
//! API layer and pass an explicit per-call context.
//!
//! ## Core Concepts
//!
//! - **Script**: tenant-scoped workflow container addressed by a human key
//! - **ScriptVersion**: one immutable-once-published graph (DRAFT → ACTIVE
//!   → RETIRED, exactly one ACTIVE per script)
//! - **Run**: an executing instance pinned to one version, tracking a
//!   cursor and collected answers
//! - **Rules**: typed clauses grouped into rules and groups, evaluated
//!   against the run's answers to route CHOICE nodes
//! - **Actions**: named side effects handed to an [`ActionDispatcher`]
//!   when the cursor lands on an ACTION node
//!
//! [`ActionDispatcher`]: dispatch::ActionDispatcher
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use scriptflow::engine::{EngineContext, ScriptEngine};
//! use scriptflow::graph::VersionBuilder;
//! use scriptflow::rules::{ChoiceConfig, Clause, ClauseKind, ClauseOperator, Group, Rule};
//! use scriptflow::store::MemoryStore;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ScriptEngine::new(Arc::new(MemoryStore::new()));
//! let ctx = EngineContext::new("acme").with_user("u-1");
//!
//! // Author a script: START -> QUESTION(age) -> CHOICE -> END.
//! let script = engine.create_script(&ctx, "age-gate").await?;
//! let adult_check = ChoiceConfig::new(
//!     vec![Group::new(vec![Rule::new(
//!         Some("n-adult".into()),
//!         vec![Clause::new(
//!             "age",
//!             ClauseKind::Number,
//!             ClauseOperator::GreaterOrEqual,
//!             json!(18),
//!         )],
//!     )])],
//!     Some("n-minor".into()),
//! );
//! let graph = VersionBuilder::new()
//!     .start("s0")
//!     .question("age")
//!     .choice("decide", &adult_check)
//!     .end("adult")
//!     .end("minor")
//!     .edge("s0", "age")
//!     .edge("age", "decide")
//!     .build();
//! let draft = engine.create_draft(&ctx, script.id, graph).await?;
//! engine.publish(&ctx, script.id, draft.version).await?;
//!
//! // Execute a run against a CRM contact.
//! let run = engine.start(&ctx, "age-gate", "crm", "contact", "c-42").await?;
//! let run = engine.advance(run.id).await?; // s0 -> age
//! engine.answer(run.id, "age", json!(21)).await?;
//! let run = engine.advance(run.id).await?; // age -> decide
//! let run = engine.advance(run.id).await?; // decide -> adult
//! assert_eq!(run.state.cursor, "adult");
//! assert!(run.is_completed());
//! # engine.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`error::EngineError`], a [`thiserror`] enum with
//! [`miette::Diagnostic`] codes. Transports branch on
//! [`EngineError::class()`](error::EngineError::class), a stable
//! [`error::ErrorClass`] (NotFound / InvalidDefinition / InvalidState /
//! BadRequest / DispatchFailure / Internal), without parsing message text:
//!
//! ```
//! use scriptflow::error::{EngineError, ErrorClass};
//! use uuid::Uuid;
//!
//! let err = EngineError::RunNotFound { run_id: Uuid::nil() };
//! assert_eq!(err.class(), ErrorClass::NotFound);
//! assert_eq!(err.class().as_str(), "NOT_FOUND");
//! ```
//!
//! ## Module Guide
//!
//! - [`model`] - Script/ScriptVersion/Node/Edge/Run/Answer domain records
//! - [`rules`] - Typed clause evaluation, condition AST, routing decisions
//! - [`graph`] - Per-version index, fluent builder, publish-time validation
//! - [`engine`] - The operation surface: authoring, publish, run lifecycle
//! - [`store`] - Persistence provider trait plus memory and SQLite backends
//! - [`dispatch`] - Action dispatcher boundary and test dispatchers
//! - [`audit`] - Lifecycle event bus with pluggable sinks
//! - [`config`] - Declarative engine configuration
//! - [`error`] - Error taxonomy and stable failure classes

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod graph;
pub mod model;
pub mod rules;
pub mod store;
