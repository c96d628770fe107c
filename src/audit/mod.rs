//! Audit trail for engine lifecycle events.
//!
//! The engine emits an [`AuditEvent`] when a run starts, when a run
//! completes, when an action is dispatched, and when a version is
//! published. Events flow through an [`AuditBus`] (unbounded channel plus
//! background listener) into pluggable [`AuditSink`]s. Emission is
//! best-effort: a failed send logs a warning and never fails the engine
//! operation that produced the event.
//!
//! # Quick Start
//!
//! ```
//! use scriptflow::audit::{AuditBus, AuditEvent, MemorySink};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sink = MemorySink::new();
//! let bus = AuditBus::with_sink(sink.clone());
//! bus.listen();
//!
//! bus.sender().send(AuditEvent::new(
//!     Some("u1".into()),
//!     AuditEvent::NAME_VERSION_PUBLISHED,
//!     AuditEvent::TARGET_VERSION,
//!     "v-1",
//!     json!({"version": 2}),
//! )).unwrap();
//!
//! bus.stop().await;
//! assert_eq!(sink.names(), vec!["version.published"]);
//! # }
//! ```

mod bus;
mod event;
mod sink;

pub use bus::AuditBus;
pub use event::AuditEvent;
pub use sink::{AuditSink, ChannelSink, MemorySink, StdOutSink};
