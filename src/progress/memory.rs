//! In-process progress store

use super::{ProgressStore, TaskProgress};
use crate::error::Result;
use crate::types::TaskId;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Progress kept in a map for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    tasks: RwLock<HashMap<TaskId, TaskProgress>>,
}

impl MemoryProgressStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn get(&self, id: &TaskId) -> Result<Option<TaskProgress>> {
        Ok(self.tasks.read().await.get(id).cloned())
    }

    async fn set(&self, id: &TaskId, progress: TaskProgress) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        if let Some(current) = tasks.get(id)
            && current.is_terminal()
        {
            debug!(task_id = %id, status = current.status.as_str(), "ignoring write to finished task");
            return Ok(false);
        }
        tasks.insert(id.clone(), progress);
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<(TaskId, TaskProgress)>> {
        let mut entries: Vec<_> = self
            .tasks
            .read()
            .await
            .iter()
            .map(|(id, p)| (id.clone(), p.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::TaskStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn set_and_get() {
        let store = MemoryProgressStore::new();
        let id = TaskId::new("20240101_000000");

        assert!(store.get(&id).await.unwrap().is_none());
        assert!(store.set(&id, TaskProgress::started()).await.unwrap());
        assert_eq!(
            store.get(&id).await.unwrap().unwrap().status,
            TaskStatus::Processing
        );
        assert!(store.contains(&id).await.unwrap());
    }

    #[tokio::test]
    async fn terminal_state_is_absorbing() {
        let store = MemoryProgressStore::new();
        let id = TaskId::new("t");

        store.set(&id, TaskProgress::started()).await.unwrap();
        assert!(store.set(&id, TaskProgress::failed("bad")).await.unwrap());
        assert!(!store.set(&id, TaskProgress::row(1, 2, "late")).await.unwrap());
        assert!(!store
            .set(&id, TaskProgress::completed(2, "m", "/download/x.zip"))
            .await
            .unwrap());

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Error);
        assert_eq!(stored.message, "bad");
    }

    #[tokio::test]
    async fn concurrent_tasks_do_not_interfere() {
        let store = Arc::new(MemoryProgressStore::new());
        let mut handles = Vec::new();
        for n in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = TaskId::new(format!("task_{n}"));
                for idx in 1..=10 {
                    store.set(&id, TaskProgress::row(idx, 10, "u")).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 8);
        assert!(all.iter().all(|(_, p)| p.completed == 10));
        assert_eq!(all[0].0.as_str(), "task_0");
    }
}
