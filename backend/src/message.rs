//! Chat webhook payloads.
//!
//! A message always carries a plain `text` fallback; richer messages add
//! `blocks` on top of it.

use chrono::NaiveDateTime;
use serde::Serialize;
use shared::summary::{self, format_date, format_time, SummaryStats};
use shared::Task;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,
    },
    Context {
        elements: Vec<TextObject>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    fn plain(text: impl Into<String>) -> Self {
        TextObject::PlainText { text: text.into() }
    }

    fn mrkdwn(text: impl Into<String>) -> Self {
        TextObject::Mrkdwn { text: text.into() }
    }
}

impl Block {
    fn section(text: impl Into<String>) -> Self {
        Block::Section {
            text: Some(TextObject::mrkdwn(text)),
            fields: Vec::new(),
        }
    }

    fn context(text: impl Into<String>) -> Self {
        Block::Context {
            elements: vec![TextObject::mrkdwn(text)],
        }
    }
}

/// What happened to a task, for per-action notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Added,
    Completed,
    Uncompleted,
    Updated,
    Deleted,
}

impl TaskAction {
    fn emoji(&self) -> &'static str {
        match self {
            TaskAction::Added => "➕",
            TaskAction::Completed => "✅",
            TaskAction::Uncompleted => "⏳",
            TaskAction::Updated => "✏️",
            TaskAction::Deleted => "🗑️",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TaskAction::Added => "Todo Added",
            TaskAction::Completed => "Todo Completed",
            TaskAction::Uncompleted => "Todo Marked as Pending",
            TaskAction::Updated => "Todo Updated",
            TaskAction::Deleted => "Todo Deleted",
        }
    }
}

fn timestamp(now: &NaiveDateTime) -> String {
    now.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

impl WebhookMessage {
    /// A text-only message under the summary heading.
    pub fn plain(body: &str) -> Self {
        Self {
            text: format!("📋 *Todo Summary*\n{body}"),
            blocks: Vec::new(),
        }
    }

    /// The structured summary report: header, totals grid, per-state
    /// sections, insight and footer.
    pub fn summary(tasks: &[Task], now: &NaiveDateTime) -> Self {
        let stats = SummaryStats::from_tasks(tasks);

        let mut blocks = vec![
            Block::Header {
                text: TextObject::plain(format!(
                    "📋 Todo Summary Report - {}",
                    format_date(now)
                )),
            },
            Block::Section {
                text: None,
                fields: vec![
                    TextObject::mrkdwn(format!("*Total Tasks:* {}", stats.total)),
                    TextObject::mrkdwn(format!("*Completed:* {} ✅", stats.completed)),
                    TextObject::mrkdwn(format!("*Pending:* {} ⏳", stats.pending)),
                    TextObject::mrkdwn(format!("*Progress:* {}% 📈", stats.completion_rate)),
                ],
            },
        ];

        if stats.completed > 0 {
            blocks.push(Block::section(format!(
                "*✅ Completed Tasks:*\n{}",
                summary::numbered(tasks.iter().filter(|t| t.completed))
            )));
        }
        if stats.pending > 0 {
            blocks.push(Block::section(format!(
                "*⏳ Pending Tasks:*\n{}",
                summary::numbered(tasks.iter().filter(|t| !t.completed))
            )));
        }

        blocks.push(Block::section(format!(
            "*🎯 Productivity Insights:*\n{}",
            stats.insight().message()
        )));
        blocks.push(Block::context(format!(
            "📤 Summary generated at {} | 💡 Regular reviews help stay productive!",
            format_time(now)
        )));

        Self {
            text: format!(
                "Todo Summary - {}/{} tasks completed ({}%)",
                stats.completed, stats.total, stats.completion_rate
            ),
            blocks,
        }
    }

    pub fn action(
        action: TaskAction,
        task_text: &str,
        detail: Option<&str>,
        now: &NaiveDateTime,
    ) -> Self {
        let emoji = action.emoji();
        let mut body = format!("*{}:* {}", action.label(), task_text);
        if let Some(detail) = detail {
            body.push_str(&format!("\n_{detail}_"));
        }

        Self {
            text: format!("{} {}", emoji, body.replace('*', "")),
            blocks: vec![
                Block::section(format!("{emoji} {body}")),
                Block::context(format!("📅 {}", timestamp(now))),
            ],
        }
    }

    pub fn simple(title: &str, message: &str, emoji: &str, now: &NaiveDateTime) -> Self {
        Self {
            text: format!("{emoji} {title}: {message}"),
            blocks: vec![
                Block::section(format!("{emoji} *{title}*\n{message}")),
                Block::context(format!("📅 {}", timestamp(now))),
            ],
        }
    }
}
