//! Where the browser keeps its task list between visits.

use shared::Task;
use thiserror::Error;

/// Key of the single JSON array in local storage.
pub const STORAGE_KEY: &str = "todos";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not save todos: {0}")]
pub struct StorageError(pub String);

pub trait TaskRepository {
    /// Anything unreadable loads as an empty list.
    fn load(&self) -> Vec<Task>;

    fn save(&mut self, tasks: &[Task]) -> Result<(), StorageError>;
}

pub fn encode(tasks: &[Task]) -> Result<String, StorageError> {
    serde_json::to_string(tasks).map_err(|e| StorageError(e.to_string()))
}

pub fn decode(raw: &str) -> Result<Vec<Task>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Keeps the encoded list in memory. Used in tests and anywhere local
/// storage is unavailable.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    raw: Option<String>,
    saves: usize,
}

impl MemoryRepository {
    pub fn with_raw(raw: &str) -> Self {
        Self {
            raw: Some(raw.to_string()),
            saves: 0,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Number of successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl TaskRepository for MemoryRepository {
    fn load(&self) -> Vec<Task> {
        self.raw
            .as_deref()
            .and_then(|raw| decode(raw).ok())
            .unwrap_or_default()
    }

    fn save(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        self.raw = Some(encode(tasks)?);
        self.saves += 1;
        Ok(())
    }
}

/// `window.localStorage`, under [`STORAGE_KEY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageRepository;

impl LocalStorageRepository {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

impl TaskRepository for LocalStorageRepository {
    fn load(&self) -> Vec<Task> {
        let Some(raw) = Self::storage().and_then(|s| s.get_item(STORAGE_KEY).ok().flatten()) else {
            return Vec::new();
        };
        match decode(&raw) {
            Ok(tasks) => tasks,
            Err(e) => {
                web_sys::console::error_1(&format!("Error parsing saved todos: {}", e).into());
                Vec::new()
            }
        }
    }

    fn save(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        let storage =
            Self::storage().ok_or_else(|| StorageError("local storage is unavailable".into()))?;
        storage
            .set_item(STORAGE_KEY, &encode(tasks)?)
            .map_err(|e| StorageError(format!("{:?}", e)))
    }
}
