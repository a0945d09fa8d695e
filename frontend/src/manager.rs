//! The browser's task list: every mutation goes through here and is
//! written back to the repository before returning.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use shared::summary::{self, SummaryStats};
use shared::{Task, UpdateTaskRequest, ValidationError};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{StorageError, TaskRepository};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No todo at position {0}")]
    NoSuchTask(usize),
    #[error("Not editing a todo")]
    NotEditing,
    #[error("No todos to clear!")]
    NothingToClear,
    #[error("No todos to summarize!")]
    NothingToSummarize,
    #[error("Could not export todos: {0}")]
    Export(String),
    #[error("Invalid import: {0}")]
    Import(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Pending,
    Completed,
}

impl Filter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Pending => !task.completed,
            Filter::Completed => task.completed,
        }
    }
}

/// A task being edited. `draft` is not applied until the edit is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub id: Uuid,
    pub draft: String,
}

/// What adopting the server's copy of a locally created task requires.
#[derive(Debug, Clone, PartialEq)]
pub enum Adoption {
    /// The server already holds the local state.
    InSync,
    /// The task changed locally while its create was in flight; the server
    /// copy (under the new id) needs this update.
    Diverged(Uuid, UpdateTaskRequest),
    /// The task was deleted locally before the create came back.
    Gone(Uuid),
}

#[derive(Debug, Clone)]
pub struct TaskManager<R> {
    repo: R,
    tasks: Vec<Task>,
    editing: Option<EditSession>,
    // local ids whose server create has not answered yet
    pending: HashSet<Uuid>,
}

impl<R: TaskRepository> TaskManager<R> {
    pub fn load(repo: R) -> Self {
        let tasks = repo.load();
        Self {
            repo,
            tasks,
            editing: None,
            pending: HashSet::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Tasks passing `filter`, with their positions in the full list.
    pub fn filtered(&self, filter: Filter) -> Vec<(usize, &Task)> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| filter.matches(task))
            .collect()
    }

    pub fn stats(&self) -> SummaryStats {
        SummaryStats::from_tasks(&self.tasks)
    }

    pub fn all_complete(&self) -> bool {
        self.stats().all_complete()
    }

    pub fn add(&mut self, text: &str) -> Result<&Task, ManagerError> {
        let task = Task::new_local(text)?;
        self.commit(|tasks| {
            tasks.push(task);
            Ok(())
        })?;
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    pub fn toggle(&mut self, index: usize) -> Result<&Task, ManagerError> {
        self.commit(|tasks| {
            tasks
                .get_mut(index)
                .ok_or(ManagerError::NoSuchTask(index))?
                .toggle();
            Ok(())
        })?;
        Ok(&self.tasks[index])
    }

    pub fn remove(&mut self, index: usize) -> Result<Task, ManagerError> {
        let task = self.commit(|tasks| {
            if index >= tasks.len() {
                return Err(ManagerError::NoSuchTask(index));
            }
            Ok(tasks.remove(index))
        })?;
        if self.editing.as_ref().is_some_and(|e| e.id == task.id) {
            self.editing = None;
        }
        Ok(task)
    }

    /// Empties the list. Asking the user to confirm is the caller's job.
    pub fn clear(&mut self) -> Result<usize, ManagerError> {
        if self.tasks.is_empty() {
            return Err(ManagerError::NothingToClear);
        }
        let cleared = self.commit(|tasks| Ok(tasks.drain(..).count()))?;
        self.editing = None;
        Ok(cleared)
    }

    pub fn editing(&self) -> Option<&EditSession> {
        self.editing.as_ref()
    }

    pub fn begin_edit(&mut self, index: usize) -> Result<(), ManagerError> {
        let task = self.tasks.get(index).ok_or(ManagerError::NoSuchTask(index))?;
        self.editing = Some(EditSession {
            id: task.id,
            draft: task.text.clone(),
        });
        Ok(())
    }

    pub fn set_draft(&mut self, draft: String) {
        if let Some(session) = self.editing.as_mut() {
            session.draft = draft;
        }
    }

    /// Commits the draft. An empty draft or a failed save is rejected and
    /// editing continues.
    pub fn save_edit(&mut self) -> Result<&Task, ManagerError> {
        let session = self.editing.as_ref().ok_or(ManagerError::NotEditing)?;
        let Some(index) = self.tasks.iter().position(|t| t.id == session.id) else {
            self.editing = None;
            return Err(ManagerError::NotEditing);
        };
        let draft = session.draft.clone();

        self.commit(|tasks| Ok(tasks[index].set_text(&draft)?))?;
        self.editing = None;
        Ok(&self.tasks[index])
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Marks a local task as created on the server but not yet answered.
    pub fn mark_pending(&mut self, local_id: Uuid) {
        self.pending.insert(local_id);
    }

    pub fn is_pending(&self, id: Uuid) -> bool {
        self.pending.contains(&id)
    }

    /// The server's create failed; the task stays local only.
    pub fn forget_pending(&mut self, local_id: Uuid) {
        self.pending.remove(&local_id);
    }

    /// Tasks the server does not know about, given the server's list.
    pub fn missing_from(&self, remote: &[Task]) -> Vec<Task> {
        let known: HashSet<Uuid> = remote.iter().map(|t| t.id).collect();
        self.tasks
            .iter()
            .filter(|t| !known.contains(&t.id) && !self.pending.contains(&t.id))
            .cloned()
            .collect()
    }

    /// Takes the server-assigned id for the task created locally as
    /// `local_id`. Text and completion made locally in the meantime win over
    /// the server's copy.
    pub fn adopt(&mut self, local_id: Uuid, remote: Task) -> Result<Adoption, ManagerError> {
        self.pending.remove(&local_id);
        let Some(index) = self.tasks.iter().position(|t| t.id == local_id) else {
            return Ok(Adoption::Gone(remote.id));
        };

        let local = &self.tasks[index];
        let update = UpdateTaskRequest {
            text: (local.text != remote.text).then(|| local.text.clone()),
            completed: (local.completed != remote.completed).then_some(local.completed),
        };
        let adopted = Task {
            id: remote.id,
            text: local.text.clone(),
            completed: local.completed,
            created_at: remote.created_at,
            updated_at: local.updated_at.max(remote.updated_at),
        };

        self.commit(|tasks| {
            tasks[index] = adopted;
            Ok(())
        })?;
        if let Some(session) = self.editing.as_mut().filter(|s| s.id == local_id) {
            session.id = remote.id;
        }

        if update.text.is_none() && update.completed.is_none() {
            Ok(Adoption::InSync)
        } else {
            Ok(Adoption::Diverged(remote.id, update))
        }
    }

    pub fn export_json(&self) -> Result<String, ManagerError> {
        serde_json::to_string_pretty(&self.tasks).map_err(|e| ManagerError::Export(e.to_string()))
    }

    /// Replaces the whole list with a previously exported one.
    pub fn import_json(&mut self, raw: &str) -> Result<usize, ManagerError> {
        let tasks: Vec<Task> =
            serde_json::from_str(raw).map_err(|e| ManagerError::Import(e.to_string()))?;
        validate_import(&tasks)?;
        self.replace_all(tasks)
    }

    pub fn replace_all(&mut self, tasks: Vec<Task>) -> Result<usize, ManagerError> {
        let count = self.commit(|current| {
            *current = tasks;
            Ok(current.len())
        })?;
        self.editing = None;
        self.pending.clear();
        Ok(count)
    }

    /// The long-form report, built without contacting the backend.
    pub fn summary(&self, now: &NaiveDateTime) -> Result<String, ManagerError> {
        if self.tasks.is_empty() {
            return Err(ManagerError::NothingToSummarize);
        }
        Ok(summary::report(&self.tasks, now))
    }

    /// Applies `change` to a copy of the list and keeps the copy only once
    /// the repository has saved it.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Vec<Task>) -> Result<T, ManagerError>,
    ) -> Result<T, ManagerError> {
        let mut next = self.tasks.clone();
        let output = change(&mut next)?;
        self.repo.save(&next)?;
        self.tasks = next;
        Ok(output)
    }
}

/// Named after the UTC calendar date, whatever the browser's time zone.
pub fn export_file_name(now: &DateTime<Utc>) -> String {
    format!("todos-{}.json", now.date_naive().format("%Y-%m-%d"))
}

fn validate_import(tasks: &[Task]) -> Result<(), ManagerError> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.id) {
            return Err(ManagerError::Import(format!("duplicate id {}", task.id)));
        }
        if task.text.trim().is_empty() {
            return Err(ManagerError::Import(format!("todo {} has no text", task.id)));
        }
        if task.updated_at < task.created_at {
            return Err(ManagerError::Import(format!(
                "todo {} was updated before it was created",
                task.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRepository;
    use chrono::NaiveDate;
    use std::thread::sleep;
    use std::time::Duration;

    fn manager(texts: &[&str]) -> TaskManager<MemoryRepository> {
        let mut manager = TaskManager::load(MemoryRepository::default());
        for text in texts {
            manager.add(text).unwrap();
        }
        manager
    }

    #[test]
    fn add_trims_and_persists() {
        let mut manager = manager(&[]);
        let task = manager.add("  buy milk  ").unwrap().clone();

        assert_eq!(task.text, "buy milk");
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(manager.repository().saves(), 1);
        assert_eq!(manager.repository().load(), vec![task]);
    }

    #[test]
    fn add_rejects_blank_text() {
        let mut manager = manager(&[]);
        assert_eq!(
            manager.add("   ").unwrap_err(),
            ManagerError::Validation(ValidationError::EmptyText)
        );
        assert!(manager.tasks().is_empty());
        assert_eq!(manager.repository().saves(), 0);
    }

    #[test]
    fn toggle_flips_completion_and_refreshes_updated_at() {
        let mut manager = manager(&["a"]);
        let before = manager.tasks()[0].clone();
        sleep(Duration::from_millis(2));

        let after = manager.toggle(0).unwrap().clone();

        assert!(after.completed);
        assert_eq!(after.text, before.text);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
        assert_eq!(manager.repository().load()[0], after);
        assert_eq!(manager.toggle(5).unwrap_err(), ManagerError::NoSuchTask(5));
    }

    #[test]
    fn draft_is_separate_from_committed_text() {
        let mut manager = manager(&["old"]);
        manager.begin_edit(0).unwrap();
        manager.set_draft("new".into());

        assert_eq!(manager.tasks()[0].text, "old");
        assert_eq!(manager.editing().unwrap().draft, "new");

        manager.cancel_edit();
        assert!(manager.editing().is_none());
        assert_eq!(manager.tasks()[0].text, "old");
    }

    #[test]
    fn save_edit_commits_trimmed_draft() {
        let mut manager = manager(&["old"]);
        manager.begin_edit(0).unwrap();
        manager.set_draft("  new  ".into());

        assert_eq!(manager.save_edit().unwrap().text, "new");
        assert!(manager.editing().is_none());
        assert_eq!(manager.repository().load()[0].text, "new");
    }

    #[test]
    fn blank_draft_keeps_editing() {
        let mut manager = manager(&["old"]);
        manager.begin_edit(0).unwrap();
        manager.set_draft(" ".into());

        assert!(matches!(manager.save_edit(), Err(ManagerError::Validation(_))));
        assert!(manager.editing().is_some());
        assert_eq!(manager.tasks()[0].text, "old");
    }

    #[test]
    fn save_without_edit_is_an_error() {
        let mut manager = manager(&["a"]);
        assert_eq!(manager.save_edit().unwrap_err(), ManagerError::NotEditing);
    }

    #[test]
    fn remove_by_position() {
        let mut manager = manager(&["a", "b", "c"]);
        manager.begin_edit(1).unwrap();

        let removed = manager.remove(1).unwrap();

        assert_eq!(removed.text, "b");
        assert!(manager.editing().is_none());
        let texts: Vec<&str> = manager.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["a", "c"]);
        assert_eq!(manager.remove(2).unwrap_err(), ManagerError::NoSuchTask(2));
    }

    #[test]
    fn clear_empties_everything() {
        let mut manager = manager(&["a", "b"]);
        assert_eq!(manager.clear().unwrap(), 2);
        assert!(manager.repository().load().is_empty());
        assert_eq!(manager.clear().unwrap_err(), ManagerError::NothingToClear);
    }

    #[test]
    fn filters_and_all_complete() {
        let mut manager = manager(&["a", "b"]);
        assert!(!manager.all_complete());
        manager.toggle(1).unwrap();

        let pending: Vec<usize> = manager.filtered(Filter::Pending).iter().map(|(i, _)| *i).collect();
        let done: Vec<usize> = manager.filtered(Filter::Completed).iter().map(|(i, _)| *i).collect();
        assert_eq!(pending, [0]);
        assert_eq!(done, [1]);
        assert_eq!(manager.filtered(Filter::All).len(), 2);
        assert_eq!(manager.stats().completion_rate, 50);

        manager.toggle(0).unwrap();
        assert!(manager.all_complete());
    }

    #[test]
    fn export_then_import_round_trips_every_field() {
        let mut source = manager(&["a", "b"]);
        source.toggle(0).unwrap();
        let exported = source.export_json().unwrap();

        let mut target = manager(&["something else"]);
        assert_eq!(target.import_json(&exported).unwrap(), 2);

        assert_eq!(target.tasks(), source.tasks());
        assert_eq!(target.repository().load(), source.tasks());
    }

    #[test]
    fn bad_import_leaves_list_alone() {
        let mut manager = manager(&["keep"]);
        let before = manager.tasks().to_vec();

        assert!(matches!(manager.import_json("[{]"), Err(ManagerError::Import(_))));

        let task = before[0].clone();
        let duplicated = serde_json::to_string(&vec![task.clone(), task]).unwrap();
        assert!(matches!(manager.import_json(&duplicated), Err(ManagerError::Import(_))));

        assert_eq!(manager.tasks(), before.as_slice());
    }

    #[test]
    fn adopt_takes_server_id() {
        let mut manager = manager(&["local"]);
        let local_id = manager.tasks()[0].id;
        manager.mark_pending(local_id);
        let remote = Task::new("local").unwrap();

        assert_eq!(manager.adopt(local_id, remote.clone()).unwrap(), Adoption::InSync);

        assert_eq!(manager.tasks()[0].id, remote.id);
        assert_eq!(manager.tasks()[0].created_at, remote.created_at);
        assert!(!manager.is_pending(local_id));
        assert_eq!(manager.repository().load()[0].id, remote.id);
    }

    #[test]
    fn local_changes_survive_adoption() {
        let mut manager = manager(&["local"]);
        let local_id = manager.tasks()[0].id;
        manager.mark_pending(local_id);
        // server answers with the task as it was when the create was sent
        let remote = Task::new("local").unwrap();
        manager.toggle(0).unwrap();
        manager.begin_edit(0).unwrap();

        let adoption = manager.adopt(local_id, remote.clone()).unwrap();

        assert_eq!(
            adoption,
            Adoption::Diverged(
                remote.id,
                UpdateTaskRequest {
                    text: None,
                    completed: Some(true),
                }
            )
        );
        assert!(manager.tasks()[0].completed);
        assert_eq!(manager.editing().unwrap().id, remote.id);
    }

    #[test]
    fn adoption_after_local_delete_reports_gone() {
        let mut manager = manager(&["short lived"]);
        let local_id = manager.tasks()[0].id;
        manager.mark_pending(local_id);
        manager.remove(0).unwrap();
        let remote = Task::new("short lived").unwrap();

        assert_eq!(manager.adopt(local_id, remote.clone()).unwrap(), Adoption::Gone(remote.id));
        assert!(manager.tasks().is_empty());
    }

    #[test]
    fn missing_from_skips_known_and_pending_tasks() {
        let mut manager = manager(&["on server", "in flight", "local only"]);
        let on_server = manager.tasks()[0].clone();
        manager.mark_pending(manager.tasks()[1].id);

        let missing = manager.missing_from(&[on_server]);

        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].text, "local only");
    }

    /// Loads a fixed list and refuses every save.
    struct ReadOnlyRepository(Vec<Task>);

    impl TaskRepository for ReadOnlyRepository {
        fn load(&self) -> Vec<Task> {
            self.0.clone()
        }

        fn save(&mut self, _tasks: &[Task]) -> Result<(), StorageError> {
            Err(StorageError("quota exceeded".into()))
        }
    }

    #[test]
    fn failed_save_leaves_list_unchanged() {
        let existing = Task::new_local("existing").unwrap();
        let mut manager = TaskManager::load(ReadOnlyRepository(vec![existing.clone()]));

        for _ in 0..2 {
            assert!(matches!(manager.add("milk"), Err(ManagerError::Storage(_))));
        }
        assert!(matches!(manager.toggle(0), Err(ManagerError::Storage(_))));
        assert!(matches!(manager.remove(0), Err(ManagerError::Storage(_))));
        assert!(matches!(manager.clear(), Err(ManagerError::Storage(_))));

        manager.begin_edit(0).unwrap();
        manager.set_draft("renamed".into());
        assert!(matches!(manager.save_edit(), Err(ManagerError::Storage(_))));
        assert!(manager.editing().is_some());

        assert_eq!(manager.tasks(), [existing]);
    }

    #[test]
    fn import_rejects_update_before_creation() {
        let mut manager = manager(&["keep"]);
        let mut task = Task::new_local("time traveller").unwrap();
        task.updated_at = task.created_at - chrono::Duration::seconds(1);
        let raw = serde_json::to_string(&vec![task]).unwrap();

        match manager.import_json(&raw) {
            Err(ManagerError::Import(reason)) => assert!(reason.contains("updated before")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(manager.tasks()[0].text, "keep");
    }

    #[test]
    fn summary_needs_tasks() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        assert_eq!(
            manager(&[]).summary(&now).unwrap_err(),
            ManagerError::NothingToSummarize
        );
        assert!(manager(&["a"]).summary(&now).unwrap().contains("Total Tasks: 1"));
    }

    #[test]
    fn export_file_uses_utc_date() {
        let late_evening_in_chicago = DateTime::parse_from_rfc3339("2024-07-09T23:30:00-05:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(export_file_name(&late_evening_in_chicago), "todos-2024-07-10.json");
    }
}
