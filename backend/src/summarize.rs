use std::sync::Arc;

use shared::summary;
use shared::Task;
use thiserror::Error;
use tracing::info;

use crate::llm::{GenerateError, TextGenerator};
use crate::message::WebhookMessage;
use crate::notify::{NotifyError, Notifier};
use crate::store::{StoreError, TaskStore};

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// There were no tasks; nothing was sent.
    Empty,
    Sent { summary: String },
}

/// Fetches every task, optionally asks the text generator for prose, and
/// posts the result to the notifier. One linear pass per call.
#[derive(Clone)]
pub struct Summarizer {
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl Summarizer {
    pub fn new(store: Arc<dyn TaskStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub async fn run(&self) -> Result<SummaryOutcome, SummaryError> {
        let tasks = self.store.list().await?;
        if tasks.is_empty() {
            info!("no tasks to summarize");
            return Ok(SummaryOutcome::Empty);
        }

        let (message, summary) = match &self.generator {
            Some(generator) => {
                let prose = generator.generate(&prompt(&tasks)).await?;
                (WebhookMessage::plain(&prose), prose)
            }
            None => {
                let now = chrono::Local::now().naive_local();
                (
                    WebhookMessage::summary(&tasks, &now),
                    summary::checklist(&tasks),
                )
            }
        };

        self.notifier.send(&message).await?;
        info!(tasks = tasks.len(), "summary sent");
        Ok(SummaryOutcome::Sent { summary })
    }
}

pub fn prompt(tasks: &[Task]) -> String {
    let list = tasks
        .iter()
        .map(|task| format!("- {}", task.text))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Summarize these todos in a concise and meaningful way:\n{list}")
}
