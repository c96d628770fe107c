//! Action dispatch boundary.
//!
//! When `advance` moves a run onto an ACTION node, the engine invokes the
//! configured [`ActionDispatcher`] exactly once with an [`ActionCall`].
//! The dispatcher is an external collaborator: the engine defines only the
//! contract, and a dispatcher failure aborts the whole `advance` so run
//! state never desynchronizes from side effects.
//!
//! Two implementations ship with the crate: [`NullDispatcher`] for
//! deployments without side effects, and [`RecordingDispatcher`] as a test
//! double.

use async_trait::async_trait;
use miette::Diagnostic;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// Payload handed to the dispatcher for one ACTION transition.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionCall {
    /// Action identifier from the node's `config.action`.
    pub action: String,
    pub tenant_id: String,
    pub run_id: Uuid,
    /// The run's `started_by`, when present.
    pub user_id: Option<String>,
    /// The node's `config.args`, passed through verbatim.
    pub args: Value,
}

/// Errors raised by an action dispatcher.
#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    /// The dispatcher has no handler for the action identifier.
    #[error("unknown action: {action}")]
    #[diagnostic(
        code(scriptflow::dispatch::unknown_action),
        help("Register a handler for this action or fix the node's config.action.")
    )]
    UnknownAction { action: String },

    /// The downstream system rejected or failed the call.
    #[error("action {action} failed: {message}")]
    #[diagnostic(code(scriptflow::dispatch::failed))]
    Failed { action: String, message: String },
}

/// External collaborator executing named side effects.
///
/// Implementations may perform I/O; the engine awaits the call inside
/// `advance` and propagates any error unmodified.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Execute the action and return its (engine-opaque) result value.
    async fn dispatch(&self, call: ActionCall) -> Result<Value, DispatchError>;
}

/// Dispatcher that accepts every action, logs it, and returns `null`.
#[derive(Clone, Debug, Default)]
pub struct NullDispatcher;

impl NullDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionDispatcher for NullDispatcher {
    async fn dispatch(&self, call: ActionCall) -> Result<Value, DispatchError> {
        tracing::debug!(action = %call.action, run_id = %call.run_id, "null dispatcher invoked");
        Ok(Value::Null)
    }
}

/// Test double capturing every call, optionally failing a named action.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    calls: Arc<Mutex<Vec<ActionCall>>>,
    fail_action: Option<String>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any call whose action matches, with [`DispatchError::Failed`].
    #[must_use]
    pub fn failing_on(mut self, action: impl Into<String>) -> Self {
        self.fail_action = Some(action.into());
        self
    }

    /// Snapshot of all captured calls.
    pub fn calls(&self) -> Vec<ActionCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ActionDispatcher for RecordingDispatcher {
    async fn dispatch(&self, call: ActionCall) -> Result<Value, DispatchError> {
        let action = call.action.clone();
        self.calls.lock().unwrap().push(call);
        if self.fail_action.as_deref() == Some(action.as_str()) {
            return Err(DispatchError::Failed {
                action,
                message: "recording dispatcher configured to fail".to_string(),
            });
        }
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(action: &str) -> ActionCall {
        ActionCall {
            action: action.to_string(),
            tenant_id: "t1".to_string(),
            run_id: Uuid::new_v4(),
            user_id: None,
            args: json!({"caseNumber": "SR-1"}),
        }
    }

    #[tokio::test]
    async fn recording_dispatcher_captures_calls() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.dispatch(call("service.createCase")).await.unwrap();
        dispatcher.dispatch(call("service.sendMail")).await.unwrap();

        let calls = dispatcher.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].action, "service.createCase");
        assert_eq!(calls[0].args["caseNumber"], "SR-1");
    }

    #[tokio::test]
    async fn recording_dispatcher_fails_named_action() {
        let dispatcher = RecordingDispatcher::new().failing_on("service.createCase");
        let err = dispatcher
            .dispatch(call("service.createCase"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Failed { .. }));
        // The call is still recorded before the failure surfaces.
        assert_eq!(dispatcher.call_count(), 1);
    }
}
