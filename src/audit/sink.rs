use std::io::{self, Result as IoResult, Stdout, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::event::AuditEvent;

/// Abstraction over an output target that consumes full audit events.
pub trait AuditSink: Send + Sync {
    /// Handle one event. The sink decides how to serialize it.
    fn handle(&mut self, event: &AuditEvent) -> IoResult<()>;
}

/// Stdout sink writing one JSON line per event.
pub struct StdOutSink {
    handle: Stdout,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self {
            handle: io::stdout(),
        }
    }
}

impl StdOutSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditSink for StdOutSink {
    fn handle(&mut self, event: &AuditEvent) -> IoResult<()> {
        let line = event.to_json_string().map_err(io::Error::other)?;
        writeln!(self.handle, "{line}")?;
        self.handle.flush()
    }
}

/// In-memory sink for testing and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all captured events.
    pub fn snapshot(&self) -> Vec<AuditEvent> {
        self.entries.lock().unwrap().clone()
    }

    /// Names of captured events, in arrival order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.name.clone())
            .collect()
    }

    /// Clear all captured events.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl AuditSink for MemorySink {
    fn handle(&mut self, event: &AuditEvent) -> IoResult<()> {
        self.entries.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Channel-based sink forwarding events to async consumers.
///
/// Useful for transports that relay the audit trail (dashboards, SSE).
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<AuditEvent>) -> Self {
        Self { tx }
    }
}

impl AuditSink for ChannelSink {
    fn handle(&mut self, event: &AuditEvent) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped"))
    }
}
