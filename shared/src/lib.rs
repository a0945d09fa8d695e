use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod summary;

pub use summary::{Insight, SummaryStats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Todo text is required")]
    EmptyText,
}

/// Trims task text, rejecting input that is empty once whitespace is gone.
pub fn normalize_text(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(trimmed.to_string())
}

impl Task {
    /// A task as the server creates it, with a random id.
    pub fn new(text: &str) -> Result<Self, ValidationError> {
        Self::with_id(Uuid::new_v4(), text)
    }

    /// A task created in the browser. The id is time-ordered so locally
    /// created tasks sort the same way they were entered.
    pub fn new_local(text: &str) -> Result<Self, ValidationError> {
        Self::with_id(Uuid::now_v7(), text)
    }

    fn with_id(id: Uuid, text: &str) -> Result<Self, ValidationError> {
        let text = normalize_text(text)?;
        let now = Utc::now();
        Ok(Self {
            id,
            text,
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_text(&mut self, raw: &str) -> Result<(), ValidationError> {
        self.text = normalize_text(raw)?;
        self.touch();
        Ok(())
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        self.touch();
    }

    pub fn toggle(&mut self) {
        self.set_completed(!self.completed);
    }

    /// Applies a partial update. Text is validated before anything changes,
    /// so a rejected update leaves the task untouched.
    pub fn apply(&mut self, update: UpdateTaskRequest) -> Result<(), ValidationError> {
        let text = update.text.as_deref().map(normalize_text).transpose()?;
        if let Some(text) = text {
            self.text = text;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        self.touch();
        Ok(())
    }

    // updated_at never moves backwards, even if the wall clock does
    fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }
}
