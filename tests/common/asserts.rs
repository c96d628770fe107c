use scriptflow::error::{EngineError, ErrorClass};
use scriptflow::model::Run;

#[allow(dead_code)]
pub fn assert_class(err: &EngineError, class: ErrorClass) {
    assert_eq!(
        err.class(),
        class,
        "expected {class} failure, got {:?}: {err}",
        err.class()
    );
}

#[allow(dead_code)]
pub fn assert_cursor(run: &Run, expected: &str) {
    assert_eq!(
        run.state.cursor, expected,
        "expected cursor at '{expected}', run was at '{}'",
        run.state.cursor
    );
}

#[allow(dead_code)]
pub fn assert_answer(run: &Run, key: &str, expected: &serde_json::Value) {
    assert_eq!(
        run.state.answers.get(key),
        Some(expected),
        "expected answers['{key}'] == {expected}, got: {:?}",
        run.state.answers
    );
}
