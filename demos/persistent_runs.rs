//! Demo 2: Persistent Runs over SQLite with Action Dispatch
//!
//! This demonstration drives the engine against the SQLite provider and
//! shows the two collaborator seams: a custom `ActionDispatcher` receiving
//! side effects, and runs that survive an engine restart because all state
//! lives in the store.
//!
//! What You'll Learn:
//! 1. Declarative Setup: `EngineConfig` + `ScriptEngine::from_config`
//! 2. ACTION Nodes: `config.action` / `config.args` handed to a dispatcher
//! 3. Dispatch Atomicity: the cursor only moves after the dispatcher returns
//! 4. Restart Safety: reopening the same database resumes mid-flight runs
//!
//! Running This Demo:
//! ```bash
//! cargo run --example persistent_runs
//! ```

use async_trait::async_trait;
use miette::Result;
use serde_json::{Value, json};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use scriptflow::config::{EngineConfig, StoreType};
use scriptflow::dispatch::{ActionCall, ActionDispatcher, DispatchError};
use scriptflow::engine::{EngineContext, ScriptEngine};
use scriptflow::graph::VersionBuilder;

fn init_tracing() {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("error,scriptflow=info,persistent_runs=info"))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
}

/// Dispatcher standing in for a CRM backend: logs the call and answers with
/// a fake case number.
struct CaseDeskDispatcher;

#[async_trait]
impl ActionDispatcher for CaseDeskDispatcher {
    async fn dispatch(&self, call: ActionCall) -> Result<Value, DispatchError> {
        info!(
            action = %call.action,
            run_id = %call.run_id,
            args = %call.args,
            "dispatching side effect"
        );
        match call.action.as_str() {
            "service.createCase" => Ok(json!({"caseNumber": "SR-2026-001"})),
            other => Err(DispatchError::UnknownAction {
                action: other.to_string(),
            }),
        }
    }
}

fn demo_config() -> EngineConfig {
    let db_path = std::env::temp_dir().join(format!("scriptflow-demo-{}.db", Uuid::new_v4()));
    EngineConfig::new(
        StoreType::Sqlite,
        Some(db_path.display().to_string()),
    )
}

async fn engine_for(config: &EngineConfig) -> Result<ScriptEngine> {
    let engine = ScriptEngine::from_config(config.clone()).await?;
    Ok(engine.with_dispatcher(std::sync::Arc::new(CaseDeskDispatcher)))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    miette::set_panic_hook();
    demo().await
}

async fn demo() -> Result<()> {
    info!("=== Demo 2: Persistent Runs over SQLite ===\n");

    let config = demo_config();
    info!(db = ?config.sqlite_db_name, "using throwaway database");

    // Step 1: author and publish an escalation flow with an ACTION node.
    let engine = engine_for(&config).await?;
    let ctx = EngineContext::new("acme").with_user("demo-operator");

    let graph = VersionBuilder::new()
        .start("s0")
        .question("severity")
        .action("open-case", "service.createCase", json!({"queue": "tier-2"}))
        .end("done")
        .edge("s0", "severity")
        .edge("severity", "open-case")
        .edge("open-case", "done")
        .build();

    let script = engine.create_script(&ctx, "escalation").await?;
    let draft = engine.create_draft(&ctx, script.id, graph).await?;
    engine.publish(&ctx, script.id, draft.version).await?;
    info!("escalation flow published");

    // Step 2: walk a run up to the QUESTION node, then stop mid-flight.
    let run = engine
        .start(&ctx, "escalation", "crm", "ticket", "t-77")
        .await?;
    engine.advance(run.id).await?;
    engine.answer(run.id, "severity", json!("high")).await?;
    info!(run_id = %run.id, "run parked at the severity question");

    engine.shutdown().await;
    drop(engine);
    info!("engine stopped; simulating a process restart");

    // Step 3: a fresh engine over the same database picks the run back up.
    let engine = engine_for(&config).await?;
    let resumed = engine.get_run(run.id).await?;
    info!(
        run_id = %resumed.id,
        cursor = %resumed.state.cursor,
        "run recovered from the store"
    );
    assert_eq!(resumed.state.answers.get("severity"), Some(&json!("high")));

    // Step 4: entering the ACTION node invokes the dispatcher, then END.
    engine.advance(run.id).await?;
    let finished = engine.advance(run.id).await?;
    info!(
        outcome = %finished.state.cursor,
        completed = finished.is_completed(),
        "escalation finished"
    );

    let history = engine.answer_history(run.id).await?;
    info!(answers = history.len(), "answer log rows persisted");

    engine.shutdown().await;
    Ok(())
}
