#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};

use scriptflow::audit::{AuditBus, MemorySink};
use scriptflow::engine::{EngineContext, ScriptEngine};
use scriptflow::graph::{GraphDefinition, VersionBuilder};
use scriptflow::model::Script;
use scriptflow::rules::{ChoiceConfig, Clause, ClauseKind, ClauseOperator, Group, Rule};
use scriptflow::store::MemoryStore;

/// Engine over a fresh memory store with a memory-only audit bus.
///
/// Returns the sink so tests can assert on emitted events after
/// `engine.shutdown().await`.
pub fn quiet_engine() -> (ScriptEngine, MemorySink) {
    let sink = MemorySink::new();
    let engine = ScriptEngine::new(Arc::new(MemoryStore::new()))
        .with_audit_bus(AuditBus::with_sink(sink.clone()));
    (engine, sink)
}

pub fn test_ctx() -> EngineContext {
    EngineContext::new("acme").with_user("tester")
}

/// Create a script named `key`, save `graph` as v1, and publish it.
pub async fn publish_graph(
    engine: &ScriptEngine,
    ctx: &EngineContext,
    key: &str,
    graph: GraphDefinition,
) -> Script {
    let script = engine.create_script(ctx, key).await.expect("create script");
    let draft = engine
        .create_draft(ctx, script.id, graph)
        .await
        .expect("create draft");
    engine
        .publish(ctx, script.id, draft.version)
        .await
        .expect("publish");
    script
}

/// START(s0) -> QUESTION(age) -> CHOICE(decide) -> END(adult) / END(minor).
///
/// The choice sends `age >= 18` to adult and everything else to the
/// default target, minor.
pub fn age_gate_graph() -> GraphDefinition {
    let adult_check = ChoiceConfig::new(
        vec![Group::new(vec![Rule::new(
            Some("n-adult".into()),
            vec![Clause::new(
                "age",
                ClauseKind::Number,
                ClauseOperator::GreaterOrEqual,
                json!(18),
            )],
        )])],
        Some("n-minor".into()),
    );
    VersionBuilder::new()
        .start("s0")
        .question("age")
        .choice("decide", &adult_check)
        .end("adult")
        .end("minor")
        .edge("s0", "age")
        .edge("age", "decide")
        .build()
}

/// START(s0) -> ACTION(act) -> END(done), with the given action config.
pub fn action_graph(action: &str, args: Value) -> GraphDefinition {
    VersionBuilder::new()
        .start("s0")
        .action("act", action, args)
        .end("done")
        .edge("s0", "act")
        .edge("act", "done")
        .build()
}

/// A linear chain START -> CONNECTOR* -> END needing `hops` advances to
/// complete.
pub fn chain_graph(hops: usize) -> GraphDefinition {
    assert!(hops >= 1, "chain needs at least START -> END");
    let mut builder = VersionBuilder::new().start("s0");
    let mut previous = "s0".to_string();
    for i in 1..hops {
        let key = format!("c{i}");
        builder = builder.connector(&key).edge(&previous, &key);
        previous = key;
    }
    builder.end("fin").edge(&previous, "fin").build()
}
