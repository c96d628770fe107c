use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::model::{Run, ScriptVersion};

/// A lifecycle event recorded by the audit trail.
///
/// Events follow the collaborator contract
/// `(actor_id, event_name, target_type, target_id, meta?)`: the engine
/// emits them, sinks decide where they go.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    /// Who triggered the event, when known.
    pub actor_id: Option<String>,
    /// Dotted event name, one of the `NAME_*` constants.
    pub name: String,
    /// Kind of record the event is about (`"run"`, `"script_version"`).
    pub target_type: String,
    /// Id of that record.
    pub target_id: String,
    /// Event-specific payload.
    pub meta: Value,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub const NAME_RUN_STARTED: &'static str = "run.started";
    pub const NAME_RUN_COMPLETED: &'static str = "run.completed";
    pub const NAME_ACTION_DISPATCHED: &'static str = "run.action_dispatched";
    pub const NAME_VERSION_PUBLISHED: &'static str = "version.published";

    pub const TARGET_RUN: &'static str = "run";
    pub const TARGET_VERSION: &'static str = "script_version";

    pub fn new(
        actor_id: Option<String>,
        name: impl Into<String>,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
        meta: Value,
    ) -> Self {
        Self {
            actor_id,
            name: name.into(),
            target_type: target_type.into(),
            target_id: target_id.into(),
            meta,
            at: Utc::now(),
        }
    }

    /// Event for a freshly created run.
    pub fn run_started(run: &Run) -> Self {
        Self::new(
            run.started_by.clone(),
            Self::NAME_RUN_STARTED,
            Self::TARGET_RUN,
            run.id.to_string(),
            json!({
                "scriptId": run.script_id,
                "versionId": run.version_id,
                "cursor": run.state.cursor,
            }),
        )
    }

    /// Event for a run that just reached an END node.
    pub fn run_completed(run: &Run) -> Self {
        Self::new(
            run.started_by.clone(),
            Self::NAME_RUN_COMPLETED,
            Self::TARGET_RUN,
            run.id.to_string(),
            json!({
                "scriptId": run.script_id,
                "versionId": run.version_id,
                "cursor": run.state.cursor,
                "completedAt": run.completed_at,
            }),
        )
    }

    /// Event for a side effect executed on entry to an ACTION node.
    ///
    /// The dispatcher's return value rides along in `meta.result`; it is
    /// never folded back into run state.
    pub fn action_dispatched(run: &Run, action: &str, result: &Value) -> Self {
        Self::new(
            run.started_by.clone(),
            Self::NAME_ACTION_DISPATCHED,
            Self::TARGET_RUN,
            run.id.to_string(),
            json!({
                "scriptId": run.script_id,
                "versionId": run.version_id,
                "action": action,
                "result": result,
            }),
        )
    }

    /// Event for a version that just became ACTIVE.
    pub fn version_published(
        actor_id: Option<String>,
        script_id: Uuid,
        version: &ScriptVersion,
    ) -> Self {
        Self::new(
            actor_id,
            Self::NAME_VERSION_PUBLISHED,
            Self::TARGET_VERSION,
            version.id.to_string(),
            json!({
                "scriptId": script_id,
                "version": version.version,
                "publishedAt": version.published_at,
            }),
        )
    }

    /// Structured JSON form with a normalized schema.
    ///
    /// ```
    /// use scriptflow::audit::AuditEvent;
    /// use serde_json::json;
    ///
    /// let event = AuditEvent::new(
    ///     Some("u1".into()),
    ///     AuditEvent::NAME_VERSION_PUBLISHED,
    ///     AuditEvent::TARGET_VERSION,
    ///     "v-123",
    ///     json!({"version": 2}),
    /// );
    /// let value = event.to_json_value();
    /// assert_eq!(value["name"], "version.published");
    /// assert_eq!(value["target"]["type"], "script_version");
    /// assert_eq!(value["meta"]["version"], 2);
    /// ```
    pub fn to_json_value(&self) -> Value {
        json!({
            "name": self.name,
            "actorId": self.actor_id,
            "target": {
                "type": self.target_type,
                "id": self.target_id,
            },
            "meta": self.meta,
            "at": self.at.to_rfc3339(),
        })
    }

    /// Compact JSON string form, as written by the stdout sink.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actor = self.actor_id.as_deref().unwrap_or("-");
        write!(
            f,
            "{} {} {}/{} by {}",
            self.at.to_rfc3339(),
            self.name,
            self.target_type,
            self.target_id,
            actor
        )
    }
}
