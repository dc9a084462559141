//! Presentation helpers derived from a task and the current time.

use serde::Serialize;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use crate::schema::{TaskCategory, TaskPriority};
use crate::task::Task;

/// Task plus the derived fields a list view renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDisplay {
    /// The underlying task.
    #[serde(flatten)]
    pub task: Task,
    /// Open with a past due date.
    pub is_overdue: bool,
    /// Relative due text such as `"in 3 days"` or `"2 hours overdue"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_until_due: Option<String>,
    /// Due date as `"Nov 28, 2025, 08:00 PM"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_due_date: Option<String>,
    /// Colour name for the priority badge.
    pub priority_color: &'static str,
    /// Icon name for the category tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_icon: Option<&'static str>,
}

impl TaskDisplay {
    /// Derive display fields for `task` as seen at `now`.
    #[must_use]
    pub fn new(task: Task, now: OffsetDateTime) -> Self {
        let is_overdue = task.is_overdue(now);
        let time_until_due = task
            .due_date
            .filter(|_| !task.is_completed)
            .map(|due| relative(due - now));
        let formatted_due_date = task.due_date.and_then(|due| {
            due.format(format_description!(
                "[month repr:short] [day padding:none], [year], [hour repr:12]:[minute] [period]"
            ))
            .ok()
        });
        Self {
            is_overdue,
            time_until_due,
            formatted_due_date,
            priority_color: priority_color(task.priority),
            category_icon: task.category.map(category_icon),
            task,
        }
    }
}

/// Badge colour per priority.
#[must_use]
pub const fn priority_color(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "gray",
        TaskPriority::Medium => "blue",
        TaskPriority::High => "orange",
        TaskPriority::Urgent => "red",
    }
}

/// Icon name per category.
#[must_use]
pub const fn category_icon(category: TaskCategory) -> &'static str {
    match category {
        TaskCategory::Work => "briefcase",
        TaskCategory::Personal => "user",
        TaskCategory::Shopping => "shopping-cart",
        TaskCategory::Health => "heart",
    }
}

fn relative(remaining: Duration) -> String {
    let overdue = remaining.is_negative();
    let span = remaining.abs();
    let (amount, unit) = if span.whole_days() > 0 {
        (span.whole_days(), "day")
    } else if span.whole_hours() > 0 {
        (span.whole_hours(), "hour")
    } else {
        (span.whole_minutes(), "minute")
    };
    let plural = if amount == 1 { "" } else { "s" };
    if overdue {
        format!("{amount} {unit}{plural} overdue")
    } else {
        format!("in {amount} {unit}{plural}")
    }
}
