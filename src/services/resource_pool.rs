//! Bounded concurrent-use registry for shared backend classes (e.g. `local`,
//! `premium_cloud`). Operations are serialized under a single lock so
//! callers never observe a transient overcommit.

use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::{ClassStatus, ResourcePoolStatus};

struct ClassState {
    max_slots: usize,
    active_task_ids: HashSet<Uuid>,
}

pub struct ResourcePool {
    classes: RwLock<HashMap<String, ClassState>>,
}

impl ResourcePool {
    /// Construct a pool with an initial `(class_name, max_slots)` set.
    /// Defaults per spec: `local` = 1, `premium_cloud` = 2.
    #[must_use]
    pub fn new(classes: impl IntoIterator<Item = (String, usize)>) -> Self {
        let classes = classes
            .into_iter()
            .map(|(name, max_slots)| {
                (
                    name,
                    ClassState {
                        max_slots,
                        active_task_ids: HashSet::new(),
                    },
                )
            })
            .collect();
        Self {
            classes: RwLock::new(classes),
        }
    }

    #[must_use]
    pub fn with_defaults(local_slots: usize, premium_slots: usize) -> Self {
        Self::new([
            ("local".to_string(), local_slots),
            ("premium_cloud".to_string(), premium_slots),
        ])
    }

    /// Atomically succeeds iff the class has a free slot or `task_id` already
    /// holds one (idempotent). Unknown classes have no limit by default: a
    /// class is implicitly created with unlimited capacity the first time it
    /// is acquired from, to avoid the Router or Assigner hard-failing on a
    /// backend class nobody has sized yet.
    pub async fn try_acquire(&self, class: &str, task_id: Uuid) -> bool {
        let mut classes = self.classes.write().await;
        let state = classes.entry(class.to_string()).or_insert_with(|| ClassState {
            max_slots: usize::MAX,
            active_task_ids: HashSet::new(),
        });
        if state.active_task_ids.contains(&task_id) {
            return true;
        }
        if state.active_task_ids.len() < state.max_slots {
            state.active_task_ids.insert(task_id);
            true
        } else {
            false
        }
    }

    pub async fn release(&self, class: &str, task_id: Uuid) {
        if let Some(state) = self.classes.write().await.get_mut(class) {
            state.active_task_ids.remove(&task_id);
        }
    }

    #[must_use]
    pub async fn status(&self) -> ResourcePoolStatus {
        let classes = self.classes.read().await;
        ResourcePoolStatus {
            classes: classes
                .iter()
                .map(|(name, state)| {
                    (
                        name.clone(),
                        ClassStatus {
                            max_slots: state.max_slots,
                            active_task_ids: state.active_task_ids.iter().copied().collect(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub async fn clear(&self) {
        for state in self.classes.write().await.values_mut() {
            state.active_task_ids.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_respects_max_slots() {
        let pool = ResourcePool::new([("local".to_string(), 1)]);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(pool.try_acquire("local", a).await);
        assert!(!pool.try_acquire("local", b).await);
    }

    #[tokio::test]
    async fn release_then_acquire_succeeds() {
        let pool = ResourcePool::new([("local".to_string(), 1)]);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(pool.try_acquire("local", a).await);
        pool.release("local", a).await;
        assert!(pool.try_acquire("local", b).await);
    }

    #[tokio::test]
    async fn reacquire_by_same_task_is_idempotent() {
        let pool = ResourcePool::new([("local".to_string(), 1)]);
        let a = Uuid::new_v4();
        assert!(pool.try_acquire("local", a).await);
        assert!(pool.try_acquire("local", a).await);
        let status = pool.status().await;
        assert_eq!(status.classes["local"].active_task_ids.len(), 1);
    }

    #[tokio::test]
    async fn release_of_absent_task_is_noop() {
        let pool = ResourcePool::new([("local".to_string(), 1)]);
        pool.release("local", Uuid::new_v4()).await;
    }

    #[tokio::test]
    async fn clear_frees_all_slots() {
        let pool = ResourcePool::with_defaults(1, 2);
        let a = Uuid::new_v4();
        pool.try_acquire("local", a).await;
        pool.clear().await;
        assert!(pool.try_acquire("local", Uuid::new_v4()).await);
    }
}
