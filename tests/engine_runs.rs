use serde_json::json;

use scriptflow::audit::AuditEvent;
use scriptflow::error::{EngineError, ErrorClass};

mod common;
use common::*;

#[tokio::test]
async fn start_positions_cursor_at_entry() {
    let (engine, _audit) = quiet_engine();
    let ctx = test_ctx();
    publish_graph(&engine, &ctx, "age-gate", age_gate_graph()).await;

    let run = engine
        .start(&ctx, "age-gate", "crm", "contact", "c-1")
        .await
        .expect("start");

    assert_cursor(&run, "s0");
    assert!(run.state.answers.is_empty());
    assert!(!run.is_completed());
    assert_eq!(run.tenant_id, "acme");
    assert_eq!(run.started_by.as_deref(), Some("tester"));
}

#[tokio::test]
async fn start_unknown_key_is_not_found() {
    let (engine, _audit) = quiet_engine();
    let ctx = test_ctx();

    let err = engine
        .start(&ctx, "nope", "crm", "contact", "c-1")
        .await
        .unwrap_err();
    assert_class(&err, ErrorClass::NotFound);
}

#[tokio::test]
async fn start_without_active_version_is_not_found() {
    let (engine, _audit) = quiet_engine();
    let ctx = test_ctx();
    // Script exists, draft exists, nothing published.
    let script = engine.create_script(&ctx, "draft-only").await.unwrap();
    engine
        .create_draft(&ctx, script.id, age_gate_graph())
        .await
        .unwrap();

    let err = engine
        .start(&ctx, "draft-only", "crm", "contact", "c-1")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoActiveVersion { .. }));
    assert_class(&err, ErrorClass::NotFound);
}

#[tokio::test]
async fn scripts_are_tenant_scoped() {
    let (engine, _audit) = quiet_engine();
    let ctx = test_ctx();
    publish_graph(&engine, &ctx, "age-gate", age_gate_graph()).await;

    let other = scriptflow::engine::EngineContext::new("globex");
    let err = engine
        .start(&other, "age-gate", "crm", "contact", "c-1")
        .await
        .unwrap_err();
    assert_class(&err, ErrorClass::NotFound);
}

#[tokio::test]
async fn answer_overwrites_bag_and_keeps_history() {
    let (engine, _audit) = quiet_engine();
    let ctx = test_ctx();
    publish_graph(&engine, &ctx, "age-gate", age_gate_graph()).await;
    let run = engine
        .start(&ctx, "age-gate", "crm", "contact", "c-1")
        .await
        .unwrap();

    engine.answer(run.id, "age", json!(15)).await.unwrap();
    engine.answer(run.id, "age", json!(21)).await.unwrap();

    let run = engine.get_run(run.id).await.unwrap();
    assert_answer(&run, "age", &json!(21));

    let history = engine.answer_history(run.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].value, json!(15));
    assert_eq!(history[1].value, json!(21));
}

#[tokio::test]
async fn answer_rejects_non_question_nodes() {
    let (engine, _audit) = quiet_engine();
    let ctx = test_ctx();
    publish_graph(&engine, &ctx, "age-gate", age_gate_graph()).await;
    let run = engine
        .start(&ctx, "age-gate", "crm", "contact", "c-1")
        .await
        .unwrap();

    let err = engine.answer(run.id, "decide", json!(1)).await.unwrap_err();
    assert!(matches!(err, EngineError::NotAQuestion { .. }));
    assert_class(&err, ErrorClass::BadRequest);

    let err = engine.answer(run.id, "ghost", json!(1)).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownNodeKey { .. }));
    assert_class(&err, ErrorClass::BadRequest);
}

#[tokio::test]
async fn minor_path_routes_to_default_target() {
    let (engine, _audit) = quiet_engine();
    let ctx = test_ctx();
    publish_graph(&engine, &ctx, "age-gate", age_gate_graph()).await;
    let run = engine
        .start(&ctx, "age-gate", "crm", "contact", "c-1")
        .await
        .unwrap();

    let run = engine.advance(run.id).await.unwrap();
    assert_cursor(&run, "age");

    engine.answer(run.id, "age", json!(15)).await.unwrap();

    let run = engine.advance(run.id).await.unwrap();
    assert_cursor(&run, "decide");

    // Group requires age >= 18; 15 fails, so the default target wins.
    let run = engine.advance(run.id).await.unwrap();
    assert_cursor(&run, "minor");
    assert!(run.is_completed());
}

#[tokio::test]
async fn adult_path_routes_through_passing_group() {
    let (engine, _audit) = quiet_engine();
    let ctx = test_ctx();
    publish_graph(&engine, &ctx, "age-gate", age_gate_graph()).await;
    let run = engine
        .start(&ctx, "age-gate", "crm", "contact", "c-2")
        .await
        .unwrap();

    engine.advance(run.id).await.unwrap();
    engine.answer(run.id, "age", json!(21)).await.unwrap();
    engine.advance(run.id).await.unwrap();
    let run = engine.advance(run.id).await.unwrap();

    assert_cursor(&run, "adult");
    assert!(run.is_completed());
}

#[tokio::test]
async fn completed_runs_are_immutable() {
    let (engine, _audit) = quiet_engine();
    let ctx = test_ctx();
    publish_graph(&engine, &ctx, "age-gate", age_gate_graph()).await;
    let run = engine
        .start(&ctx, "age-gate", "crm", "contact", "c-3")
        .await
        .unwrap();

    engine.advance(run.id).await.unwrap();
    engine.answer(run.id, "age", json!(40)).await.unwrap();
    engine.advance(run.id).await.unwrap();
    let run = engine.advance(run.id).await.unwrap();
    assert!(run.is_completed());

    let err = engine.advance(run.id).await.unwrap_err();
    assert!(matches!(err, EngineError::RunCompleted { .. }));
    assert_class(&err, ErrorClass::InvalidState);

    let err = engine.answer(run.id, "age", json!(1)).await.unwrap_err();
    assert_class(&err, ErrorClass::InvalidState);
}

#[tokio::test]
async fn advance_with_no_outgoing_edges_is_bad_request() {
    let (engine, _audit) = quiet_engine();
    let ctx = test_ctx();
    // QUESTION(age) has no outgoing edge. Validation accepts that (drafts
    // may dead-end) but advancing from age has nowhere to go.
    let graph = scriptflow::graph::VersionBuilder::new()
        .start("s0")
        .question("age")
        .end("fin")
        .edge("s0", "age")
        .edge("s0", "fin")
        .build();
    publish_graph(&engine, &ctx, "dead-end", graph).await;
    let run = engine
        .start(&ctx, "dead-end", "crm", "contact", "c-4")
        .await
        .unwrap();

    let run = engine.advance(run.id).await.unwrap();
    assert_cursor(&run, "age");

    let err = engine.advance(run.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NoTransition { .. }));
    assert_class(&err, ErrorClass::BadRequest);
}

#[tokio::test]
async fn unknown_run_is_not_found() {
    let (engine, _audit) = quiet_engine();
    let missing = uuid::Uuid::new_v4();

    let err = engine.advance(missing).await.unwrap_err();
    assert!(matches!(err, EngineError::RunNotFound { .. }));

    let err = engine.get_run(missing).await.unwrap_err();
    assert_class(&err, ErrorClass::NotFound);

    let err = engine.answer_history(missing).await.unwrap_err();
    assert_class(&err, ErrorClass::NotFound);
}

#[tokio::test]
async fn lifecycle_events_reach_the_audit_sink() {
    let (engine, audit) = quiet_engine();
    let ctx = test_ctx();
    publish_graph(&engine, &ctx, "age-gate", age_gate_graph()).await;
    let run = engine
        .start(&ctx, "age-gate", "crm", "contact", "c-5")
        .await
        .unwrap();

    engine.advance(run.id).await.unwrap();
    engine.answer(run.id, "age", json!(30)).await.unwrap();
    engine.advance(run.id).await.unwrap();
    engine.advance(run.id).await.unwrap();
    engine.shutdown().await;

    let names = audit.names();
    assert_eq!(
        names,
        vec![
            AuditEvent::NAME_VERSION_PUBLISHED,
            AuditEvent::NAME_RUN_STARTED,
            AuditEvent::NAME_RUN_COMPLETED,
        ]
    );

    let events = audit.snapshot();
    let started = &events[1];
    assert_eq!(started.actor_id.as_deref(), Some("tester"));
    assert_eq!(started.target_id, run.id.to_string());
}
