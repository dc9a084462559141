//! Client-side listing queries and summary statistics over a task slice.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use taskmaster_core::schema::{FilterType, SortDirection, SortType, TaskCategory, TaskPriority};
use taskmaster_core::task::{Task, TaskFilterOptions, TaskSortOptions};
use taskmaster_core::text_matcher::TextMatcher;
use time::OffsetDateTime;

/// Filter, search and ordering applied to the client-side task list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    filter: FilterType,
    sort: SortType,
    direction: Option<SortDirection>,
    search: Option<String>,
    options: TaskFilterOptions,
}

impl TaskQuery {
    /// Every task, newest first.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict by completion.
    #[must_use]
    pub const fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Order by the given field in its natural direction.
    #[must_use]
    pub const fn with_sort(mut self, sort: SortType) -> Self {
        self.sort = sort;
        self
    }

    /// Override the natural direction of the sort field.
    #[must_use]
    pub const fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Apply validated sort options.
    #[must_use]
    pub const fn with_sort_options(self, options: TaskSortOptions) -> Self {
        self.with_sort(options.field).with_direction(options.direction)
    }

    /// Case-insensitive search over title, description and category. Blank
    /// text clears the search.
    #[must_use]
    pub fn with_search(mut self, text: &str) -> Self {
        let trimmed = text.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// Additional structured criteria from validated filter options.
    #[must_use]
    pub fn with_options(mut self, options: TaskFilterOptions) -> Self {
        self.options = options;
        self
    }

    /// Effective sort direction.
    #[must_use]
    pub fn direction(&self) -> SortDirection {
        self.direction.unwrap_or_else(|| self.sort.natural_direction())
    }

    /// Matching tasks in query order. Ties keep their input order.
    #[must_use]
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let matcher = self.search.as_deref().and_then(TextMatcher::new);
        let mut selected: Vec<Task> = tasks
            .iter()
            .filter(|task| self.keeps(task))
            .filter(|task| matcher.as_ref().is_none_or(|matcher| matcher.matches(task)))
            .filter(|task| self.options.matches(task))
            .cloned()
            .collect();
        let direction = self.direction();
        selected.sort_by(|a, b| compare(self.sort, direction, a, b));
        selected
    }

    const fn keeps(&self, task: &Task) -> bool {
        match self.filter {
            FilterType::All => true,
            FilterType::Active => !task.is_completed,
            FilterType::Completed => task.is_completed,
        }
    }
}

fn compare(sort: SortType, direction: SortDirection, a: &Task, b: &Task) -> Ordering {
    let ordering = match sort {
        SortType::Created => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
        SortType::Due => match (a.due_date, b.due_date) {
            (Some(left), Some(right)) => left.cmp(&right),
            // Undated tasks sort last in either direction.
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortType::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortType::Priority => a.priority.rank().cmp(&b.priority.rank()),
    };
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Aggregate counts for a task list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStats {
    /// Number of tasks.
    pub total: usize,
    /// Completed tasks.
    pub completed: usize,
    /// Open tasks.
    pub active: usize,
    /// Open tasks past their due date.
    pub overdue: usize,
    /// Tasks per category; uncategorized tasks are not counted.
    pub by_category: BTreeMap<TaskCategory, usize>,
    /// Tasks per priority.
    pub by_priority: BTreeMap<TaskPriority, usize>,
    /// Share of completed tasks, 0 to 100.
    pub completion_rate: f64,
    /// Mean hours from creation to completion, when any completed task has both
    /// timestamps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_completion_hours: Option<f64>,
}

impl TaskStats {
    /// Summarize `tasks` as seen at `now`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(tasks: &[Task], now: OffsetDateTime) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.is_completed).count();
        let overdue = tasks.iter().filter(|task| task.is_overdue(now)).count();

        let mut by_category = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        for task in tasks {
            if let Some(category) = task.category {
                *by_category.entry(category).or_insert(0) += 1;
            }
            *by_priority.entry(task.priority).or_insert(0) += 1;
        }

        let completion_rate = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };

        let durations: Vec<f64> = tasks
            .iter()
            .filter(|task| task.is_completed)
            .filter_map(|task| task.completed_at.map(|done| done - task.created_at))
            .map(|elapsed| elapsed.as_seconds_f64() / 3600.0)
            .collect();
        let average_completion_hours =
            (!durations.is_empty()).then(|| durations.iter().sum::<f64>() / durations.len() as f64);

        Self {
            total,
            completed,
            active: total - completed,
            overdue,
            by_category,
            by_priority,
            completion_rate,
            average_completion_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted_remote::sample_task;
    use time::Duration;
    use time::macros::datetime;

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|task| task.id.get()).collect()
    }

    fn fixture() -> Vec<Task> {
        let mut milk = sample_task(1, "buy milk");
        milk.category = Some(TaskCategory::Shopping);
        milk.priority = TaskPriority::Low;
        milk.due_date = Some(datetime!(2025-12-05 10:00 UTC));

        let mut report = sample_task(2, "Quarterly report");
        report.category = Some(TaskCategory::Work);
        report.priority = TaskPriority::Urgent;
        report.description = Some("numbers for the board".into());
        report.due_date = Some(datetime!(2025-12-01 10:00 UTC));

        let mut run = sample_task(3, "Morning run");
        run.category = Some(TaskCategory::Health);
        run.set_completed(true, run.created_at + Duration::hours(2));

        vec![run, report, milk]
    }

    #[test]
    fn default_query_lists_newest_first() {
        let tasks = fixture();
        assert_eq!(ids(&TaskQuery::new().apply(&tasks)), vec![3, 2, 1]);
    }

    #[test]
    fn completion_filters_split_the_list() {
        let tasks = fixture();
        let active = TaskQuery::new().with_filter(FilterType::Active).apply(&tasks);
        let done = TaskQuery::new().with_filter(FilterType::Completed).apply(&tasks);
        assert_eq!(ids(&active), vec![2, 1]);
        assert_eq!(ids(&done), vec![3]);
    }

    #[test]
    fn search_covers_description_and_category() {
        let tasks = fixture();
        let board = TaskQuery::new().with_search("BOARD").apply(&tasks);
        assert_eq!(ids(&board), vec![2]);
        let health = TaskQuery::new().with_search("health").apply(&tasks);
        assert_eq!(ids(&health), vec![3]);
        let blank = TaskQuery::new().with_search("   ").apply(&tasks);
        assert_eq!(blank.len(), 3);
    }

    #[test]
    fn due_sort_puts_undated_tasks_last_in_both_directions() {
        let tasks = fixture();
        let ascending = TaskQuery::new().with_sort(SortType::Due).apply(&tasks);
        assert_eq!(ids(&ascending), vec![2, 1, 3]);
        let descending = TaskQuery::new()
            .with_sort(SortType::Due)
            .with_direction(SortDirection::Desc)
            .apply(&tasks);
        assert_eq!(ids(&descending), vec![1, 2, 3]);
    }

    #[test]
    fn title_sort_ignores_case() {
        let tasks = fixture();
        let sorted = TaskQuery::new().with_sort(SortType::Title).apply(&tasks);
        assert_eq!(ids(&sorted), vec![1, 3, 2]);
    }

    #[test]
    fn priority_sort_is_most_urgent_first() {
        let tasks = fixture();
        let sorted = TaskQuery::new().with_sort(SortType::Priority).apply(&tasks);
        assert_eq!(ids(&sorted), vec![2, 3, 1]);
        let options = TaskSortOptions {
            field: SortType::Priority,
            direction: SortDirection::Asc,
        };
        let reversed = TaskQuery::new().with_sort_options(options).apply(&tasks);
        assert_eq!(ids(&reversed), vec![1, 3, 2]);
    }

    #[test]
    fn structured_options_narrow_results() {
        let tasks = fixture();
        let options = TaskFilterOptions {
            category: Some(TaskCategory::Work),
            ..TaskFilterOptions::default()
        };
        assert_eq!(ids(&TaskQuery::new().with_options(options).apply(&tasks)), vec![2]);
    }

    #[test]
    fn stats_summarize_counts_and_rates() {
        let tasks = fixture();
        let stats = TaskStats::compute(&tasks, datetime!(2025-12-03 00:00 UTC));
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.by_category.get(&TaskCategory::Work), Some(&1));
        assert_eq!(stats.by_category.len(), 3);
        assert_eq!(stats.by_priority.get(&TaskPriority::Medium), Some(&1));
        assert!((stats.completion_rate - 100.0 / 3.0).abs() < 1e-9);
        assert!(
            stats
                .average_completion_hours
                .is_some_and(|hours| (hours - 2.0).abs() < 1e-9)
        );
    }

    #[test]
    fn stats_of_empty_list_are_zero() {
        let stats = TaskStats::compute(&[], datetime!(2025-12-03 00:00 UTC));
        assert_eq!(stats.total, 0);
        assert!(stats.completion_rate.abs() < f64::EPSILON);
        assert!(stats.average_completion_hours.is_none());
    }
}
