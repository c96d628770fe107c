use std::sync::{Arc, Mutex};
use tokio::{sync::oneshot, task};
use tracing::warn;

use super::event::AuditEvent;
use super::sink::{AuditSink, StdOutSink};

/// Receives audit events from the engine and broadcasts them to sinks.
///
/// The bus owns an unbounded channel; [`AuditBus::sender`] hands out cheap
/// clones for producers. Events are drained by a background listener task
/// started with [`listen`](AuditBus::listen); sinks can be added at any
/// time, including while the listener runs.
pub struct AuditBus {
    sinks: Arc<Mutex<Vec<Box<dyn AuditSink>>>>,
    channel: (flume::Sender<AuditEvent>, flume::Receiver<AuditEvent>),
    listener: Arc<Mutex<Option<ListenerState>>>,
}

impl Default for AuditBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl AuditBus {
    /// Create a bus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: AuditSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Create a bus with multiple sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            channel: flume::unbounded(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Dynamically add a sink.
    pub fn add_sink<T: AuditSink + 'static>(&self, sink: T) {
        self.sinks.lock().unwrap().push(Box::new(sink));
    }

    /// Clone of the sender side for producers.
    pub fn sender(&self) -> flume::Sender<AuditEvent> {
        self.channel.0.clone()
    }

    /// Spawn the background task draining events into every sink.
    /// Idempotent: calling multiple times has no effect.
    pub fn listen(&self) {
        let mut guard = self.listener.lock().expect("listener poisoned");
        if guard.is_some() {
            return;
        }

        let receiver = self.channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    recv = receiver.recv_async() => match recv {
                        Err(err) => {
                            warn!(error = %err, "audit bus receiver closed");
                            break;
                        }
                        Ok(event) => {
                            let mut sinks_guard = sinks.lock().unwrap();
                            for sink in sinks_guard.iter_mut() {
                                if let Err(err) = sink.handle(&event) {
                                    warn!(error = %err, name = %event.name, "audit sink error");
                                }
                            }
                        }
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the listener after draining events already queued.
    pub async fn stop(&self) {
        let state = {
            let mut guard = self.listener.lock().expect("listener poisoned");
            guard.take()
        };
        if let Some(state) = state {
            // Drain what is already in the channel before signalling.
            while let Ok(event) = self.channel.1.try_recv() {
                let mut sinks_guard = self.sinks.lock().unwrap();
                for sink in sinks_guard.iter_mut() {
                    if let Err(err) = sink.handle(&event) {
                        warn!(error = %err, name = %event.name, "audit sink error");
                    }
                }
            }
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for AuditBus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(state) = guard.take() {
                let _ = state.shutdown_tx.send(());
                state.handle.abort();
            }
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}
