#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::{Duration, sleep};

use scriptflow::dispatch::{ActionCall, ActionDispatcher, DispatchError};

/// Dispatcher that sleeps before answering, to widen race windows in
/// concurrency tests.
#[derive(Debug, Clone)]
pub struct SlowDispatcher {
    pub delay_ms: u64,
}

#[async_trait]
impl ActionDispatcher for SlowDispatcher {
    async fn dispatch(&self, call: ActionCall) -> Result<serde_json::Value, DispatchError> {
        sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(json!({ "ok": true, "action": call.action }))
    }
}

/// Dispatcher that fails its first `failures` calls, then succeeds.
#[derive(Clone, Default)]
pub struct FlakyDispatcher {
    failures: usize,
    attempts: Arc<AtomicUsize>,
}

impl FlakyDispatcher {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionDispatcher for FlakyDispatcher {
    async fn dispatch(&self, call: ActionCall) -> Result<serde_json::Value, DispatchError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(DispatchError::Failed {
                action: call.action,
                message: format!("induced failure on attempt {attempt}"),
            });
        }
        Ok(json!({ "ok": true }))
    }
}
