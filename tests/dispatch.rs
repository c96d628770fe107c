//! ACTION node side effects: exactly-once dispatch, failure atomicity, and
//! the audit trail of dispatched actions.

use std::sync::Arc;

use serde_json::json;

use scriptflow::audit::{AuditBus, AuditEvent, MemorySink};
use scriptflow::dispatch::RecordingDispatcher;
use scriptflow::engine::ScriptEngine;
use scriptflow::error::{EngineError, ErrorClass};
use scriptflow::graph::VersionBuilder;
use scriptflow::model::{Node, NodeKind};
use scriptflow::store::MemoryStore;

mod common;
use common::*;

fn recording_engine(dispatcher: RecordingDispatcher) -> (ScriptEngine, MemorySink) {
    let sink = MemorySink::new();
    let engine = ScriptEngine::new(Arc::new(MemoryStore::new()))
        .with_dispatcher(Arc::new(dispatcher))
        .with_audit_bus(AuditBus::with_sink(sink.clone()));
    (engine, sink)
}

#[tokio::test]
async fn action_dispatches_exactly_once_with_node_args() {
    let dispatcher = RecordingDispatcher::new();
    let (engine, _sink) = recording_engine(dispatcher.clone());
    let ctx = test_ctx();
    publish_graph(
        &engine,
        &ctx,
        "case-flow",
        action_graph("service.createCase", json!({"caseNumber": "SR-1"})),
    )
    .await;

    let run = engine
        .start(&ctx, "case-flow", "crm", "contact", "c-1")
        .await
        .unwrap();
    let run = engine.advance(run.id).await.unwrap();
    assert_cursor(&run, "act");
    assert!(!run.is_completed());

    let calls = dispatcher.calls();
    assert_eq!(calls.len(), 1, "entering the ACTION node dispatches once");
    let call = &calls[0];
    assert_eq!(call.action, "service.createCase");
    assert_eq!(call.args, json!({"caseNumber": "SR-1"}));
    assert_eq!(call.tenant_id, "acme");
    assert_eq!(call.run_id, run.id);
    assert_eq!(call.user_id.as_deref(), Some("tester"));

    // Completing the run does not re-dispatch.
    let run = engine.advance(run.id).await.unwrap();
    assert!(run.is_completed());
    assert_eq!(dispatcher.call_count(), 1);
}

#[tokio::test]
async fn failed_dispatch_leaves_the_cursor_in_place() {
    let dispatcher = RecordingDispatcher::new().failing_on("service.createCase");
    let (engine, _sink) = recording_engine(dispatcher.clone());
    let ctx = test_ctx();
    publish_graph(
        &engine,
        &ctx,
        "case-flow",
        action_graph("service.createCase", json!({"caseNumber": "SR-1"})),
    )
    .await;

    let run = engine
        .start(&ctx, "case-flow", "crm", "contact", "c-1")
        .await
        .unwrap();

    let err = engine.advance(run.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Dispatch(_)));
    assert_class(&err, ErrorClass::DispatchFailure);

    // The transition was not persisted; the run can be retried.
    let reloaded = engine.get_run(run.id).await.unwrap();
    assert_cursor(&reloaded, "s0");
    assert!(!reloaded.is_completed());
    assert_eq!(dispatcher.call_count(), 1);
}

#[tokio::test]
async fn retry_after_dispatch_failure_dispatches_again() {
    let dispatcher = FlakyDispatcher::failing_first(1);
    let sink = MemorySink::new();
    let engine = ScriptEngine::new(Arc::new(MemoryStore::new()))
        .with_dispatcher(Arc::new(dispatcher.clone()))
        .with_audit_bus(AuditBus::with_sink(sink.clone()));
    let ctx = test_ctx();
    publish_graph(
        &engine,
        &ctx,
        "case-flow",
        action_graph("service.createCase", json!({"caseNumber": "SR-2"})),
    )
    .await;

    let run = engine
        .start(&ctx, "case-flow", "crm", "contact", "c-1")
        .await
        .unwrap();

    let err = engine.advance(run.id).await.unwrap_err();
    assert_class(&err, ErrorClass::DispatchFailure);

    // The cursor never moved, so retrying re-enters the ACTION node and
    // dispatches a second time.
    let run = engine.advance(run.id).await.unwrap();
    assert_cursor(&run, "act");
    assert_eq!(dispatcher.attempts(), 2);

    let run = engine.advance(run.id).await.unwrap();
    assert!(run.is_completed());
    assert_eq!(dispatcher.attempts(), 2, "END transition does not dispatch");
}

#[tokio::test]
async fn action_node_without_action_is_a_bad_request() {
    let (engine, _sink) = recording_engine(RecordingDispatcher::new());
    let ctx = test_ctx();
    // Hand-built ACTION node with a config that has no usable action string.
    let graph = VersionBuilder::new()
        .start("s0")
        .node(
            Node::new("n-act", "act", NodeKind::Action).with_config(json!({"args": {"x": 1}})),
        )
        .end("done")
        .edge("s0", "act")
        .edge("act", "done")
        .build();
    publish_graph(&engine, &ctx, "no-action", graph).await;

    let run = engine
        .start(&ctx, "no-action", "crm", "contact", "c-1")
        .await
        .unwrap();
    let err = engine.advance(run.id).await.unwrap_err();
    assert!(matches!(err, EngineError::MissingAction { .. }));
    assert_class(&err, ErrorClass::BadRequest);

    // Still parked on the start node.
    let run = engine.get_run(run.id).await.unwrap();
    assert_cursor(&run, "s0");
}

#[tokio::test]
async fn dispatch_result_lands_in_audit_meta_not_state() {
    let (engine, sink) = recording_engine(RecordingDispatcher::new());
    let ctx = test_ctx();
    publish_graph(
        &engine,
        &ctx,
        "case-flow",
        action_graph("service.createCase", json!({"caseNumber": "SR-3"})),
    )
    .await;

    let run = engine
        .start(&ctx, "case-flow", "crm", "contact", "c-1")
        .await
        .unwrap();
    engine.advance(run.id).await.unwrap();
    let run = engine.advance(run.id).await.unwrap();
    engine.shutdown().await;

    let events = sink.snapshot();
    let dispatched = events
        .iter()
        .find(|event| event.name == AuditEvent::NAME_ACTION_DISPATCHED)
        .expect("action_dispatched event");
    assert_eq!(dispatched.target_id, run.id.to_string());
    assert_eq!(dispatched.meta["action"], "service.createCase");
    // RecordingDispatcher returns null; whatever it returns stays in meta.
    assert_eq!(dispatched.meta["result"], json!(null));

    // The run's variable bag never sees dispatch results.
    assert!(run.state.answers.is_empty());
}

#[tokio::test]
async fn failed_dispatch_emits_no_audit_event() {
    let dispatcher = RecordingDispatcher::new().failing_on("service.createCase");
    let (engine, sink) = recording_engine(dispatcher);
    let ctx = test_ctx();
    publish_graph(
        &engine,
        &ctx,
        "case-flow",
        action_graph("service.createCase", json!({})),
    )
    .await;

    let run = engine
        .start(&ctx, "case-flow", "crm", "contact", "c-1")
        .await
        .unwrap();
    engine.advance(run.id).await.unwrap_err();
    engine.shutdown().await;

    let names = sink.names();
    assert!(
        !names.contains(&AuditEvent::NAME_ACTION_DISPATCHED.to_string()),
        "no dispatch event for a failed dispatch, got {names:?}"
    );
}
