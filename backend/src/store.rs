//! Task persistence.
//!
//! The store owns no business rules: callers validate and build [`Task`]
//! records, the store only reads and writes them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use shared::Task;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("stored task could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks, newest `created_at` first.
    async fn list(&self) -> Result<Vec<Task>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Inserts or replaces the record with `task.id`.
    async fn save(&self, task: &Task) -> Result<(), StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

fn newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn task_key(id: Uuid) -> String {
    format!("task:{}", id)
}

/// Tasks as JSON strings under `task:<id>` keys.
#[derive(Clone)]
pub struct RedisTaskStore {
    client: Arc<Client>,
}

impl RedisTaskStore {
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let mut conn = self.client.get_async_connection().await?;

        let keys: Vec<String> = conn.keys("task:*").await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = conn.mget(&keys).await?;
        let mut tasks = Vec::with_capacity(values.len());
        for (key, value) in keys.iter().zip(values) {
            // a key can vanish between KEYS and MGET
            let Some(json) = value else { continue };
            match serde_json::from_str::<Task>(&json) {
                Ok(task) => tasks.push(task),
                Err(e) => tracing::warn!(%key, error = %e, "skipping unreadable task record"),
            }
        }

        newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let mut conn = self.client.get_async_connection().await?;
        let json: Option<String> = conn.get(task_key(id)).await?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let json = serde_json::to_string(task)?;
        let mut conn = self.client.get_async_connection().await?;
        conn.set::<_, _, ()>(task_key(task.id), json).await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut conn = self.client.get_async_connection().await?;
        let deleted: usize = conn.del(task_key(id)).await?;
        Ok(deleted > 0)
    }
}

/// Process-local store, used by tests and `STORE=memory`.
#[derive(Clone, Default)]
pub struct MemoryTaskStore {
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.tasks.read().await.values().cloned().collect();
        newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tasks.write().await.remove(&id).is_some())
    }
}
