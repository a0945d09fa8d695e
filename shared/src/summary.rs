//! Summary statistics and plain-text renderings of a task list.
//!
//! Both the backend notifier and the browser build their reports from the
//! same [`SummaryStats`], so the numbers and insight tiers always agree.

use chrono::NaiveDateTime;

use crate::Task;

const RULE: &str = "═══════════════════════════════════════";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Whole percent, `0` for an empty list.
    pub completion_rate: u8,
}

impl SummaryStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            pending: total - completed,
            completion_rate: completion_rate(completed, total),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn all_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }

    pub fn insight(&self) -> Insight {
        Insight::from_rate(self.completion_rate)
    }
}

pub fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insight {
    Excellent,
    Good,
    Progressing,
    PowerThrough,
}

impl Insight {
    pub fn from_rate(rate: u8) -> Self {
        match rate {
            80.. => Insight::Excellent,
            60..=79 => Insight::Good,
            40..=59 => Insight::Progressing,
            _ => Insight::PowerThrough,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Insight::Excellent => "🌟 Excellent progress! You're crushing your goals!",
            Insight::Good => "👍 Good work! Keep the momentum going!",
            Insight::Progressing => "💪 You're making progress! Stay focused!",
            Insight::PowerThrough => "🚀 Time to power through those remaining tasks!",
        }
    }
}

pub fn format_date(at: &NaiveDateTime) -> String {
    at.format("%A, %B %-d, %Y").to_string()
}

pub fn format_time(at: &NaiveDateTime) -> String {
    at.format("%I:%M %p").to_string()
}

/// `• ✓ text` per completed task and `• ⃝ text` per pending one.
pub fn checklist(tasks: &[Task]) -> String {
    tasks
        .iter()
        .map(|task| format!("• {} {}", if task.completed { "✓" } else { "⃝" }, task.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `1. text` lines, numbered from one.
pub fn numbered<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> String {
    tasks
        .into_iter()
        .enumerate()
        .map(|(i, task)| format!("{}. {}", i + 1, task.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The long-form report the browser shows without contacting the backend.
pub fn report(tasks: &[Task], now: &NaiveDateTime) -> String {
    let stats = SummaryStats::from_tasks(tasks);
    let mut out = format!(
        "📋 Todo Summary Report - {} at {}\n\n",
        format_date(now),
        format_time(now)
    );

    out.push_str(&format!(
        "📊 OVERVIEW:\n{RULE}\nTotal Tasks: {}\n✅ Completed: {}\n⏳ Pending: {}\n📈 Progress: {}%\n\n",
        stats.total, stats.completed, stats.pending, stats.completion_rate
    ));

    if stats.completed > 0 {
        out.push_str(&format!(
            "✅ COMPLETED TASKS:\n{RULE}\n{}\n\n",
            numbered(tasks.iter().filter(|t| t.completed))
        ));
    }
    if stats.pending > 0 {
        out.push_str(&format!(
            "⏳ PENDING TASKS:\n{RULE}\n{}\n\n",
            numbered(tasks.iter().filter(|t| !t.completed))
        ));
    }

    out.push_str(&format!(
        "🎯 PRODUCTIVITY INSIGHTS:\n{RULE}\n{}\n\n",
        stats.insight().message()
    ));
    out.push_str("📤 Status: Summary Generated Successfully!\n");
    out.push_str("💡 Tip: Regular Task Reviews Help Maintain Productivity!");
    out
}
