//! Per-project exclusive locks.
//!
//! Different projects proceed concurrently; transitions on the same project
//! are serialized. The guard is owned, so it is released on every exit path
//! when it drops. A project's entry lives only while someone holds or waits
//! for its lock, so names that never become projects leave nothing behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use docsmith_core::ProjectName;

type LockMap = Arc<Mutex<HashMap<ProjectName, Arc<AsyncMutex<()>>>>>;

#[derive(Debug, Default)]
pub struct ProjectLocks {
    inner: LockMap,
}

/// Held for the duration of one project transition.
#[derive(Debug)]
pub struct ProjectGuard {
    // Field order matters: the mutex guard must drop before the slot.
    _guard: OwnedMutexGuard<()>,
    _slot: Slot,
}

/// One holder's or waiter's claim on a map entry. Dropping the last claim
/// removes the entry.
#[derive(Debug)]
struct Slot {
    map: LockMap,
    project: ProjectName,
    lock: Option<Arc<AsyncMutex<()>>>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        drop(self.lock.take());
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        // Clones are only handed out under the map lock, so a count of one
        // means the map itself is the last owner.
        if map.get(&self.project).is_some_and(|l| Arc::strong_count(l) == 1) {
            map.remove(&self.project);
        }
    }
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `project`.
    pub async fn acquire(&self, project: &ProjectName) -> ProjectGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(project.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let slot = Slot {
            map: Arc::clone(&self.inner),
            project: project.clone(),
            lock: Some(Arc::clone(&lock)),
        };
        ProjectGuard {
            _guard: lock.lock_owned().await,
            _slot: slot,
        }
    }

    /// Whether a transition on `project` is in flight.
    pub fn is_locked(&self, project: &ProjectName) -> bool {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(project).is_some_and(|l| l.try_lock().is_err())
    }

    /// Number of projects currently holding or waiting for a lock.
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
