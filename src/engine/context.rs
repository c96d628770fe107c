use serde::{Deserialize, Serialize};

/// Explicit per-call context for tenant-scoped operations.
///
/// Carried as a value on every call instead of living in ambient or global
/// state, so one engine instance serves any number of tenants. `user_id`
/// identifies the acting CRM user and flows into `started_by` and audit
/// actor fields; `None` means a system-initiated call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineContext {
    pub tenant_id: String,
    pub user_id: Option<String>,
}

impl EngineContext {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: None,
        }
    }

    /// Attach the acting user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
