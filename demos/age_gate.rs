//! Demo 1: Authoring, Publishing, and Running a Script
//!
//! This demonstration walks the full lifecycle of a scripted decision flow:
//! authoring a version graph in code, the publish-time validation gate,
//! and two runs routed to different outcomes by the same CHOICE node.
//!
//! What You'll Learn:
//! 1. Graph Authoring: Assembling nodes and edges with `VersionBuilder`
//! 2. The Publish Gate: Broken drafts are rejected, valid ones go ACTIVE
//! 3. Run Execution: `start` / `answer` / `advance` and the cursor walk
//! 4. Typed Routing: A ChoiceConfig splitting on a numeric answer
//! 5. Audit Trail: Reading lifecycle events back from a memory sink
//!
//! Running This Demo:
//! ```bash
//! cargo run --example age_gate
//! ```

use std::sync::Arc;

use miette::Result;
use serde_json::json;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use scriptflow::audit::{AuditBus, MemorySink};
use scriptflow::engine::{EngineContext, ScriptEngine};
use scriptflow::graph::VersionBuilder;
use scriptflow::rules::{ChoiceConfig, Clause, ClauseKind, ClauseOperator, Group, Rule};
use scriptflow::store::MemoryStore;

fn init_tracing() {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("error,scriptflow=info,age_gate=info"))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
}

fn init_miette() {
    // Pretty panic reports
    miette::set_panic_hook();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_miette();
    demo().await
}

async fn demo() -> Result<()> {
    info!("=== Demo 1: Authoring, Publishing, and Running ===\n");

    // Step 1: engine over the in-memory store, audit into a readable sink.
    let sink = MemorySink::new();
    let engine = ScriptEngine::new(Arc::new(MemoryStore::new()))
        .with_audit_bus(AuditBus::with_sink(sink.clone()));
    let ctx = EngineContext::new("acme").with_user("demo-author");

    let script = engine.create_script(&ctx, "age-gate").await?;
    info!(script_id = %script.id, "script container created");

    // Step 2: the publish gate. A draft with no START node is accepted as a
    // draft but refused at publish time.
    let broken = VersionBuilder::new().question("age").build();
    let draft = engine.create_draft(&ctx, script.id, broken).await?;
    match engine.publish(&ctx, script.id, draft.version).await {
        Ok(_) => unreachable!("a graph without START must not publish"),
        Err(err) => info!(error = %err, "draft v1 rejected as expected"),
    }

    // Step 3: a complete graph. START -> QUESTION(age) -> CHOICE, routed by
    // a single numeric rule with a default for everyone else.
    let adult_rule = Rule::new(
        Some(VersionBuilder::id_for("adult")),
        vec![Clause::new(
            "age",
            ClauseKind::Number,
            ClauseOperator::GreaterOrEqual,
            json!(18),
        )],
    );
    let routing = ChoiceConfig::new(
        vec![Group::new(vec![adult_rule])],
        Some(VersionBuilder::id_for("minor")),
    );
    let graph = VersionBuilder::new()
        .start("s0")
        .question("age")
        .choice("decide", &routing)
        .end("adult")
        .end("minor")
        .edge("s0", "age")
        .edge("age", "decide")
        .build();

    let draft = engine.create_draft(&ctx, script.id, graph).await?;
    let active = engine.publish(&ctx, script.id, draft.version).await?;
    info!(version = active.version, status = %active.status, "version published");

    // Step 4: two runs, two outcomes.
    for (subject, age) in [("c-100", 15), ("c-200", 42)] {
        let run = engine.start(&ctx, "age-gate", "crm", "contact", subject).await?;
        info!(run_id = %run.id, cursor = %run.state.cursor, subject, "run started");

        engine.advance(run.id).await?;
        engine.answer(run.id, "age", json!(age)).await?;
        engine.advance(run.id).await?;
        let run = engine.advance(run.id).await?;

        info!(
            subject,
            age,
            outcome = %run.state.cursor,
            completed = run.is_completed(),
            "run finished"
        );
    }

    // Step 5: the audit trail, drained on shutdown.
    engine.shutdown().await;
    info!("audit trail:");
    for event in sink.snapshot() {
        info!("  {event}");
    }

    Ok(())
}
