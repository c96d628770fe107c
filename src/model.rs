//! Core domain records for the scriptflow decision engine.
//!
//! This module defines the persisted shapes the engine operates on: scripts,
//! their versioned graph definitions, and the runs executing against them.
//! These are the domain concepts that define what a script *is*; the indexed
//! view used for traversal lives in [`crate::graph`], and the typed rule
//! language lives in [`crate::rules`].
//!
//! # Key Types
//!
//! - [`Script`]: tenant-scoped workflow container, addressed by `key`
//! - [`ScriptVersion`]: one immutable-once-published graph definition
//! - [`Node`] / [`Edge`]: the flat, id-indexed graph collections
//! - [`Run`] / [`RunState`] / [`Answer`]: execution state and answer history
//!
//! # Examples
//!
//! ```rust
//! use scriptflow::model::{NodeKind, VersionStatus};
//!
//! let kind = NodeKind::Choice;
//! assert_eq!(kind.encode(), "CHOICE");
//! assert_eq!(NodeKind::decode("CHOICE"), Some(NodeKind::Choice));
//!
//! let status = VersionStatus::Active;
//! assert!(status.is_active());
//! assert_eq!(status.to_string(), "ACTIVE");
//! ```

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::rules::{ChoiceConfig, Condition};

/// Lifecycle status of a [`ScriptVersion`].
///
/// Exactly one version per script may be [`Active`](Self::Active) at any
/// observable instant; publishing a new version retires the previous one in
/// the same atomic store operation.
///
/// # Persistence
///
/// `VersionStatus` serializes to its UPPERCASE wire form through both serde
/// and the [`encode`](Self::encode)/[`decode`](Self::decode) methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionStatus {
    /// Editable, not yet visible to `start`.
    Draft,
    /// The single version runs execute against.
    Active,
    /// Formerly active; existing runs keep executing against it.
    Retired,
}

impl VersionStatus {
    /// Encode into the persisted string form.
    ///
    /// ```rust
    /// # use scriptflow::model::VersionStatus;
    /// assert_eq!(VersionStatus::Retired.encode(), "RETIRED");
    /// ```
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            VersionStatus::Draft => "DRAFT",
            VersionStatus::Active => "ACTIVE",
            VersionStatus::Retired => "RETIRED",
        }
    }

    /// Decode a persisted string form; `None` for unrecognized input.
    ///
    /// ```rust
    /// # use scriptflow::model::VersionStatus;
    /// assert_eq!(VersionStatus::decode("DRAFT"), Some(VersionStatus::Draft));
    /// assert_eq!(VersionStatus::decode("draft"), None);
    /// ```
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(VersionStatus::Draft),
            "ACTIVE" => Some(VersionStatus::Active),
            "RETIRED" => Some(VersionStatus::Retired),
            _ => None,
        }
    }

    /// Returns `true` for [`Active`](Self::Active).
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` for [`Draft`](Self::Draft).
    #[must_use]
    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft)
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

/// Identifies the kind of a node within a script version's graph.
///
/// The kind drives both routing (CHOICE nodes evaluate a
/// [`ChoiceConfig`], everything else uses edge conditions) and the
/// side effects of landing on the node (ACTION dispatches, END completes
/// the run).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    /// Entry point; exactly one per version, referenced by `entry_node_id`.
    Start,
    /// Collects an answer into the run's variable bag.
    Question,
    /// Routes via grouped typed rules instead of edge conditions.
    Choice,
    /// Dispatches a named side effect when the cursor lands on it.
    Action,
    /// Terminal node; landing here completes the run.
    End,
    /// Structural pass-through with plain edge routing.
    Connector,
}

impl NodeKind {
    /// Encode into the persisted string form.
    ///
    /// ```rust
    /// # use scriptflow::model::NodeKind;
    /// assert_eq!(NodeKind::Action.encode(), "ACTION");
    /// ```
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            NodeKind::Start => "START",
            NodeKind::Question => "QUESTION",
            NodeKind::Choice => "CHOICE",
            NodeKind::Action => "ACTION",
            NodeKind::End => "END",
            NodeKind::Connector => "CONNECTOR",
        }
    }

    /// Decode a persisted string form; `None` for unrecognized input.
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "START" => Some(NodeKind::Start),
            "QUESTION" => Some(NodeKind::Question),
            "CHOICE" => Some(NodeKind::Choice),
            "ACTION" => Some(NodeKind::Action),
            "END" => Some(NodeKind::End),
            "CONNECTOR" => Some(NodeKind::Connector),
            _ => None,
        }
    }

    /// Returns `true` if this is a [`Start`](Self::Start) node.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` if this is an [`End`](Self::End) node.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

/// A named, tenant-scoped workflow definition container.
///
/// Scripts own their versions; the script record itself carries no graph
/// data. `key` is unique per tenant and is how transports address a script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: Uuid,
    pub tenant_id: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
}

impl Script {
    /// Create a script record with a fresh id.
    pub fn new(tenant_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            key: key.into(),
            created_at: Utc::now(),
        }
    }
}

/// One versioned graph definition belonging to a [`Script`].
///
/// Nodes and edges are flat `Vec`s addressed by id; definition order of
/// `edges` is significant for routing fallback. Once a version is published
/// its graph is treated as immutable; runs bind to the version they started
/// on and never migrate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptVersion {
    pub id: Uuid,
    pub script_id: Uuid,
    pub version: i32,
    pub status: VersionStatus,
    pub entry_node_id: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ScriptVersion {
    /// Create a DRAFT version with a fresh id.
    pub fn draft(
        script_id: Uuid,
        version: i32,
        entry_node_id: impl Into<String>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            script_id,
            version,
            status: VersionStatus::Draft,
            entry_node_id: entry_node_id.into(),
            nodes,
            edges,
            published_at: None,
            created_at: Utc::now(),
        }
    }
}

/// A graph vertex with a kind and kind-specific config payload.
///
/// `id` is the opaque identifier edges reference; `key` is the stable
/// human-addressable name (unique within a version) used by run cursors and
/// answer submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub key: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub config: Value,
}

impl Node {
    pub fn new(id: impl Into<String>, key: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            kind,
            config: Value::Null,
        }
    }

    /// Attach a config payload.
    #[must_use]
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Typed view of an ACTION node's config.
    ///
    /// Returns `None` when the payload has no usable `action` string, which
    /// callers treat as "ACTION node missing config.action".
    pub fn action_config(&self) -> Option<ActionConfig> {
        serde_json::from_value(self.config.clone()).ok()
    }

    /// Typed view of a CHOICE node's config.
    pub fn choice_config(&self) -> Result<ChoiceConfig, serde_json::Error> {
        serde_json::from_value(self.config.clone())
    }
}

/// Config payload carried by ACTION nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub action: String,
    #[serde(default)]
    pub args: Value,
}

/// A directed connection between two nodes, optionally guarded.
///
/// Plain (non-CHOICE) routing takes the first edge whose condition holds,
/// falling back to the first outgoing edge when none do. An absent condition
/// always holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            condition: None,
            label: None,
        }
    }

    /// Guard this edge with a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Attach a display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Mutable execution state carried by a [`Run`].
///
/// Wire shape: `{"cursor": nodeKey, "answers": {nodeKey: value}}`. The
/// answers map is last-write-wins; full history lives in the [`Answer`] log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub cursor: String,
    #[serde(default)]
    pub answers: FxHashMap<String, Value>,
}

impl RunState {
    /// Fresh state positioned at the given node key.
    pub fn at(cursor: impl Into<String>) -> Self {
        Self {
            cursor: cursor.into(),
            answers: FxHashMap::default(),
        }
    }
}

/// One executing instance of a [`ScriptVersion`].
///
/// Bound to its (script, version) pair at creation. Mutated only by
/// `answer` and `advance`; immutable once `completed_at` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub tenant_id: String,
    pub script_id: Uuid,
    pub version_id: Uuid,
    pub subject_schema: String,
    pub subject_model: String,
    pub subject_id: String,
    pub state: RunState,
    pub started_by: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Run {
    /// Create a RUNNING run positioned at `cursor`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: impl Into<String>,
        script_id: Uuid,
        version_id: Uuid,
        subject_schema: impl Into<String>,
        subject_model: impl Into<String>,
        subject_id: impl Into<String>,
        started_by: Option<String>,
        cursor: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            script_id,
            version_id,
            subject_schema: subject_schema.into(),
            subject_model: subject_model.into(),
            subject_id: subject_id.into(),
            state: RunState::at(cursor),
            started_by,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Returns `true` once `completed_at` is set.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Record an answer value (last-write-wins).
    pub fn set_answer(&mut self, node_key: impl Into<String>, value: Value) {
        self.state.answers.insert(node_key.into(), value);
    }

    /// Mark the run completed at the given instant.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.completed_at = Some(at);
    }
}

/// Immutable append-only record of one submitted answer.
///
/// Written on every `answer` call, even when the value overwrites an earlier
/// one in [`RunState::answers`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub run_id: Uuid,
    pub node_key: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(run_id: Uuid, node_key: impl Into<String>, value: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            node_key: node_key.into(),
            value,
            created_at: Utc::now(),
        }
    }
}
