use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-run async locks.
///
/// `answer` and `advance` are read-modify-write cycles on the same persisted
/// Run; holding that run's lock across the whole cycle serializes concurrent
/// callers without blocking unrelated runs. The outer sync mutex only guards
/// the map itself and is never held across an await.
#[derive(Default)]
pub struct RunLocks {
    locks: Mutex<FxHashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl RunLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock for `run_id`, creating it on first use.
    pub async fn acquire(&self, run_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("run lock registry poisoned");
            locks
                .entry(run_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop the registry entry when no caller holds or awaits the lock.
    ///
    /// Called after a run completes; completed runs reject further mutation,
    /// so their locks would otherwise accumulate forever.
    pub fn prune(&self, run_id: Uuid) {
        let mut locks = self.locks.lock().expect("run lock registry poisoned");
        if let Some(lock) = locks.get(&run_id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(&run_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().expect("run lock registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
