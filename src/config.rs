//! Engine configuration with environment-backed defaults.
//!
//! [`EngineConfig`] picks the persistence provider and audit sinks for
//! [`ScriptEngine::from_config`](crate::engine::ScriptEngine::from_config).
//! The SQLite database name resolves from (in order) an explicit value, the
//! `SCRIPTFLOW_DB_NAME` environment variable, then `scriptflow.db`; a
//! `.env` file is honored via dotenvy.

use crate::audit::{AuditBus, AuditSink, MemorySink, StdOutSink};

/// Which persistence provider the engine runs against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreType {
    Memory,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub store: StoreType,
    pub sqlite_db_name: Option<String>,
    pub audit: AuditConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store: StoreType::Memory,
            sqlite_db_name: Self::resolve_sqlite_db_name(None),
            audit: AuditConfig::default(),
        }
    }
}

impl EngineConfig {
    fn resolve_sqlite_db_name(provided: Option<String>) -> Option<String> {
        if let Some(name) = provided {
            return Some(name);
        }
        dotenvy::dotenv().ok();
        Some(std::env::var("SCRIPTFLOW_DB_NAME").unwrap_or_else(|_| "scriptflow.db".to_string()))
    }

    pub fn new(store: StoreType, sqlite_db_name: Option<String>) -> Self {
        Self {
            store,
            sqlite_db_name: Self::resolve_sqlite_db_name(sqlite_db_name),
            audit: AuditConfig::default(),
        }
    }

    #[must_use]
    pub fn with_audit(mut self, audit: AuditConfig) -> Self {
        self.audit = audit;
        self
    }

    #[must_use]
    pub fn with_stdout_audit(self) -> Self {
        self.with_audit(AuditConfig::with_stdout_only())
    }

    #[must_use]
    pub fn with_memory_audit(self) -> Self {
        self.with_audit(AuditConfig::with_memory_sink())
    }

    /// Connection URL for the SQLite provider.
    ///
    /// `SCRIPTFLOW_SQLITE_URL` overrides everything; otherwise the resolved
    /// database name is wrapped as `sqlite://{name}?mode=rwc` so the file is
    /// created on first connect.
    pub fn sqlite_url(&self) -> Option<String> {
        dotenvy::dotenv().ok();
        std::env::var("SCRIPTFLOW_SQLITE_URL").ok().or_else(|| {
            self.sqlite_db_name
                .as_ref()
                .map(|name| format!("sqlite://{name}?mode=rwc"))
        })
    }
}

/// Audit sink selection, declarative form of [`AuditBus`] wiring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkConfig {
    StdOut,
    Memory,
}

#[derive(Clone, Debug)]
pub struct AuditConfig {
    pub sinks: Vec<SinkConfig>,
}

impl AuditConfig {
    #[must_use]
    pub fn with_stdout_only() -> Self {
        Self {
            sinks: vec![SinkConfig::StdOut],
        }
    }

    #[must_use]
    pub fn with_memory_sink() -> Self {
        Self {
            sinks: vec![SinkConfig::StdOut, SinkConfig::Memory],
        }
    }

    #[must_use]
    pub fn add_sink(mut self, sink: SinkConfig) -> Self {
        if !self.sinks.contains(&sink) {
            self.sinks.push(sink);
        }
        self
    }

    pub fn sinks(&self) -> &[SinkConfig] {
        &self.sinks
    }

    /// Materialize the configured sinks into a bus (listener not started).
    pub fn build_bus(&self) -> AuditBus {
        let sinks: Vec<Box<dyn AuditSink>> = self
            .sinks
            .iter()
            .map(|sink| match sink {
                SinkConfig::StdOut => Box::new(StdOutSink::new()) as Box<dyn AuditSink>,
                SinkConfig::Memory => Box::new(MemorySink::new()),
            })
            .collect();
        AuditBus::with_sinks(sinks)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::with_stdout_only()
    }
}
