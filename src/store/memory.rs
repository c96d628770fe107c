use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use uuid::Uuid;

use super::{ScriptStore, StoreError, StoreResult};
use crate::model::{Answer, Run, Script, ScriptVersion, VersionStatus};

/// Volatile [`ScriptStore`] backed by mutex-guarded maps.
///
/// Suited to tests and development; nothing survives the process. Uniqueness
/// rules match the SQLite schema so tests exercise the same conflicts a
/// durable deployment would hit.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    scripts: FxHashMap<Uuid, Script>,
    versions: FxHashMap<Uuid, ScriptVersion>,
    runs: FxHashMap<Uuid, Run>,
    answers: Vec<Answer>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

#[async_trait]
impl ScriptStore for MemoryStore {
    async fn create_script(&self, script: &Script) -> StoreResult<()> {
        let mut inner = self.locked();
        let taken = inner
            .scripts
            .values()
            .any(|s| s.tenant_id == script.tenant_id && s.key == script.key);
        if taken {
            return Err(StoreError::Conflict {
                message: format!(
                    "script key '{}' already exists for tenant '{}'",
                    script.key, script.tenant_id
                ),
            });
        }
        inner.scripts.insert(script.id, script.clone());
        Ok(())
    }

    async fn script_by_id(&self, id: Uuid) -> StoreResult<Option<Script>> {
        Ok(self.locked().scripts.get(&id).cloned())
    }

    async fn script_by_key(&self, tenant_id: &str, key: &str) -> StoreResult<Option<Script>> {
        Ok(self
            .locked()
            .scripts
            .values()
            .find(|s| s.tenant_id == tenant_id && s.key == key)
            .cloned())
    }

    async fn create_version(&self, version: &ScriptVersion) -> StoreResult<()> {
        let mut inner = self.locked();
        let taken = inner
            .versions
            .values()
            .any(|v| v.script_id == version.script_id && v.version == version.version);
        if taken {
            return Err(StoreError::Conflict {
                message: format!(
                    "version {} already exists for script {}",
                    version.version, version.script_id
                ),
            });
        }
        inner.versions.insert(version.id, version.clone());
        Ok(())
    }

    async fn version_by_id(&self, id: Uuid) -> StoreResult<Option<ScriptVersion>> {
        Ok(self.locked().versions.get(&id).cloned())
    }

    async fn version_by_number(
        &self,
        script_id: Uuid,
        version: i32,
    ) -> StoreResult<Option<ScriptVersion>> {
        Ok(self
            .locked()
            .versions
            .values()
            .find(|v| v.script_id == script_id && v.version == version)
            .cloned())
    }

    async fn active_version(&self, script_id: Uuid) -> StoreResult<Option<ScriptVersion>> {
        Ok(self
            .locked()
            .versions
            .values()
            .find(|v| v.script_id == script_id && v.status == VersionStatus::Active)
            .cloned())
    }

    async fn latest_version_number(&self, script_id: Uuid) -> StoreResult<Option<i32>> {
        Ok(self
            .locked()
            .versions
            .values()
            .filter(|v| v.script_id == script_id)
            .map(|v| v.version)
            .max())
    }

    async fn publish_version(
        &self,
        script_id: Uuid,
        version: i32,
        published_at: DateTime<Utc>,
    ) -> StoreResult<Option<ScriptVersion>> {
        // Retire and activate under one lock so no reader can observe a
        // script with zero or two ACTIVE versions.
        let mut inner = self.locked();
        let Some(target_id) = inner
            .versions
            .values()
            .find(|v| v.script_id == script_id && v.version == version)
            .map(|v| v.id)
        else {
            return Ok(None);
        };
        for v in inner.versions.values_mut() {
            if v.script_id == script_id && v.status == VersionStatus::Active && v.id != target_id {
                v.status = VersionStatus::Retired;
            }
        }
        let target = inner
            .versions
            .get_mut(&target_id)
            .expect("target version vanished under lock");
        target.status = VersionStatus::Active;
        target.published_at = Some(published_at);
        Ok(Some(target.clone()))
    }

    async fn insert_run(&self, run: &Run) -> StoreResult<()> {
        self.locked().runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn run_by_id(&self, id: Uuid) -> StoreResult<Option<Run>> {
        Ok(self.locked().runs.get(&id).cloned())
    }

    async fn update_run(&self, run: &Run) -> StoreResult<()> {
        let mut inner = self.locked();
        if !inner.runs.contains_key(&run.id) {
            return Err(StoreError::Corrupt {
                message: format!("update for unknown run {}", run.id),
            });
        }
        inner.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn append_answer(&self, answer: &Answer) -> StoreResult<()> {
        self.locked().answers.push(answer.clone());
        Ok(())
    }

    async fn answers_for_run(&self, run_id: Uuid) -> StoreResult<Vec<Answer>> {
        Ok(self
            .locked()
            .answers
            .iter()
            .filter(|a| a.run_id == run_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, NodeKind};

    fn store_with_script() -> (MemoryStore, Script) {
        let store = MemoryStore::new();
        let script = Script::new("acme", "onboarding");
        (store, script)
    }

    fn draft(script: &Script, version: i32) -> ScriptVersion {
        ScriptVersion::draft(
            script.id,
            version,
            "n-start",
            vec![Node::new("n-start", "start", NodeKind::Start)],
            vec![],
        )
    }

    #[tokio::test]
    async fn duplicate_key_conflicts_within_tenant_only() {
        let (store, script) = store_with_script();
        store.create_script(&script).await.unwrap();

        let same_key = Script::new("acme", "onboarding");
        assert!(matches!(
            store.create_script(&same_key).await,
            Err(StoreError::Conflict { .. })
        ));

        let other_tenant = Script::new("globex", "onboarding");
        store.create_script(&other_tenant).await.unwrap();
    }

    #[tokio::test]
    async fn publish_retires_previous_active() {
        let (store, script) = store_with_script();
        store.create_script(&script).await.unwrap();
        let v1 = draft(&script, 1);
        let v2 = draft(&script, 2);
        store.create_version(&v1).await.unwrap();
        store.create_version(&v2).await.unwrap();

        store
            .publish_version(script.id, 1, Utc::now())
            .await
            .unwrap()
            .unwrap();
        let activated = store
            .publish_version(script.id, 2, Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(activated.id, v2.id);
        assert!(activated.published_at.is_some());
        let retired = store.version_by_id(v1.id).await.unwrap().unwrap();
        assert_eq!(retired.status, VersionStatus::Retired);
        let active = store.active_version(script.id).await.unwrap().unwrap();
        assert_eq!(active.id, v2.id);
    }

    #[tokio::test]
    async fn publish_unknown_version_is_none() {
        let (store, script) = store_with_script();
        store.create_script(&script).await.unwrap();
        let missing = store.publish_version(script.id, 7, Utc::now()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn answers_come_back_in_append_order() {
        let (store, script) = store_with_script();
        let run = Run::new(
            "acme",
            script.id,
            Uuid::new_v4(),
            "crm",
            "contact",
            "c-1",
            None,
            "n-start",
        );
        store.insert_run(&run).await.unwrap();
        for key in ["q-name", "q-age", "q-city"] {
            let answer = Answer::new(run.id, key, serde_json::json!("x"));
            store.append_answer(&answer).await.unwrap();
        }

        let history = store.answers_for_run(run.id).await.unwrap();
        let keys: Vec<&str> = history.iter().map(|a| a.node_key.as_str()).collect();
        assert_eq!(keys, vec!["q-name", "q-age", "q-city"]);
    }
}
