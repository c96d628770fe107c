//! Crate-wide error taxonomy for the decision engine.
//!
//! Every public operation returns [`EngineError`]. Each variant carries a
//! stable diagnostic code and maps onto one [`ErrorClass`], so transports can
//! translate failures into status codes without inspecting message text.

use miette::Diagnostic;
use thiserror::Error;
use uuid::Uuid;

use crate::dispatch::DispatchError;
use crate::graph::GraphError;
use crate::store::StoreError;

/// Convenient result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Coarse failure classification exposed to integrating transports.
///
/// The class is stable across releases; message text and variant payloads
/// are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    NotFound,
    InvalidDefinition,
    InvalidState,
    BadRequest,
    DispatchFailure,
    Internal,
}

impl ErrorClass {
    /// Stable string identifier, suitable for wire protocols and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::NotFound => "NOT_FOUND",
            ErrorClass::InvalidDefinition => "INVALID_DEFINITION",
            ErrorClass::InvalidState => "INVALID_STATE",
            ErrorClass::BadRequest => "BAD_REQUEST",
            ErrorClass::DispatchFailure => "DISPATCH_FAILURE",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by engine operations.
///
/// Variants are grouped by [`ErrorClass`]; see [`EngineError::class`].
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    /// No script with the given key exists for the tenant.
    #[error("script not found: tenant={tenant_id} key={key}")]
    #[diagnostic(
        code(scriptflow::engine::script_not_found),
        help("Check the script key and that it belongs to the caller's tenant.")
    )]
    ScriptNotFound { tenant_id: String, key: String },

    /// The script exists but has no version with the requested number.
    #[error("version {version} not found for script {script_id}")]
    #[diagnostic(code(scriptflow::engine::version_not_found))]
    VersionNotFound { script_id: Uuid, version: i32 },

    /// The script has no ACTIVE version to run against.
    #[error("script {script_id} has no active version")]
    #[diagnostic(
        code(scriptflow::engine::no_active_version),
        help("Publish a version before starting runs.")
    )]
    NoActiveVersion { script_id: Uuid },

    /// No run with the given id exists.
    #[error("run not found: {run_id}")]
    #[diagnostic(code(scriptflow::engine::run_not_found))]
    RunNotFound { run_id: Uuid },

    /// A routing decision referenced a node id absent from the version.
    #[error("target node {node_id} not found in version")]
    #[diagnostic(
        code(scriptflow::engine::target_not_found),
        help("The version's edges or choice config reference a node that does not exist.")
    )]
    TargetNotFound { node_id: String },

    /// Structural problem with a version's graph.
    #[error(transparent)]
    #[diagnostic(code(scriptflow::engine::invalid_definition))]
    Graph(#[from] GraphError),

    /// Operation attempted on a run that has already completed.
    #[error("run {run_id} is completed")]
    #[diagnostic(
        code(scriptflow::engine::run_completed),
        help("Completed runs are immutable; start a new run instead.")
    )]
    RunCompleted { run_id: Uuid },

    /// The node key does not belong to the run's bound version.
    #[error("node {node_key} does not belong to the run's version")]
    #[diagnostic(code(scriptflow::engine::unknown_node_key))]
    UnknownNodeKey { node_key: String },

    /// An answer was submitted for a node that is not a QUESTION.
    #[error("node {node_key} is {kind}, not QUESTION")]
    #[diagnostic(code(scriptflow::engine::not_a_question))]
    NotAQuestion { node_key: String, kind: String },

    /// The run's cursor points at a node key missing from the version.
    #[error("cursor {cursor} does not resolve to a node in the run's version")]
    #[diagnostic(code(scriptflow::engine::invalid_cursor))]
    InvalidCursor { cursor: String },

    /// Routing produced no target node.
    #[error("no valid transition from current node {node_key}")]
    #[diagnostic(
        code(scriptflow::engine::no_transition),
        help("Add an outgoing edge, a passing rule target, or a default target.")
    )]
    NoTransition { node_key: String },

    /// An ACTION node is missing its action identifier.
    #[error("ACTION node {node_key} missing config.action")]
    #[diagnostic(code(scriptflow::engine::missing_action))]
    MissingAction { node_key: String },

    /// A script with the same tenant-scoped key already exists.
    #[error("script key '{key}' already taken for tenant {tenant_id}")]
    #[diagnostic(code(scriptflow::engine::script_exists))]
    ScriptExists { tenant_id: String, key: String },

    /// The external action dispatcher failed.
    #[error("action dispatch failed")]
    #[diagnostic(code(scriptflow::engine::dispatch_failure))]
    Dispatch(#[from] DispatchError),

    /// Persistence provider failure.
    #[error("store error")]
    #[diagnostic(code(scriptflow::engine::store))]
    Store(#[from] StoreError),
}

impl EngineError {
    /// The stable failure class for this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::ScriptNotFound { .. }
            | EngineError::VersionNotFound { .. }
            | EngineError::NoActiveVersion { .. }
            | EngineError::RunNotFound { .. }
            | EngineError::TargetNotFound { .. } => ErrorClass::NotFound,
            EngineError::Graph(_) => ErrorClass::InvalidDefinition,
            EngineError::RunCompleted { .. } => ErrorClass::InvalidState,
            EngineError::UnknownNodeKey { .. }
            | EngineError::NotAQuestion { .. }
            | EngineError::InvalidCursor { .. }
            | EngineError::NoTransition { .. }
            | EngineError::MissingAction { .. }
            | EngineError::ScriptExists { .. } => ErrorClass::BadRequest,
            EngineError::Dispatch(_) => ErrorClass::DispatchFailure,
            EngineError::Store(_) => ErrorClass::Internal,
        }
    }
}
