use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskCategory, TaskStatus};
use crate::store::TasksState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    DueDate,
    Title,
    Status,
    Category,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ViewFilters {
    /// `None` shows every category.
    #[serde(default)]
    pub category: Option<TaskCategory>,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl ViewFilters {
    /// True when anything differs from the defaults (the "clear filters" affordance).
    pub fn is_active(&self) -> bool {
        *self != ViewFilters::default()
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(category) = self.category {
            if task.category != category {
                return false;
            }
        }
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle)
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = match self.sort_by {
            SortField::DueDate => match (a.due_date, b.due_date) {
                (None, None) => return Ordering::Equal,
                // Undated tasks sink to the bottom in both directions.
                (None, Some(_)) => return Ordering::Greater,
                (Some(_), None) => return Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b),
            },
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::Status => a.status.as_str().cmp(b.status.as_str()),
            SortField::Category => a.category.as_str().cmp(b.category.as_str()),
        };
        match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// List view rows: filtered, then sorted by the chosen field.
pub fn list_view<'a>(tasks: &'a TasksState, filters: &ViewFilters) -> Vec<&'a Task> {
    let mut rows: Vec<&Task> = tasks
        .tasks
        .iter()
        .filter(|task| filters.matches(task))
        .collect();
    rows.sort_by(|a, b| filters.compare(a, b));
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn<'a> {
    pub status: TaskStatus,
    pub title: &'static str,
    pub tasks: Vec<&'a Task>,
}

pub fn column_title(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "To Do",
        TaskStatus::InProgress => "In Progress",
        TaskStatus::Completed => "Completed",
    }
}

/// Board lanes: filtered tasks grouped by status, each lane in rank order.
pub fn board_columns<'a>(tasks: &'a TasksState, filters: &ViewFilters) -> Vec<BoardColumn<'a>> {
    TaskStatus::ALL
        .iter()
        .map(|&status| {
            let mut lane: Vec<&Task> = tasks
                .tasks
                .iter()
                .filter(|task| task.status == status && filters.matches(task))
                .collect();
            lane.sort_by_key(|task| task.order);
            BoardColumn {
                status,
                title: column_title(status),
                tasks: lane,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub todo: usize,
    pub in_progress: usize,
    pub completed: usize,
}

pub fn status_counts(tasks: &TasksState) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for task in &tasks.tasks {
        match task.status {
            TaskStatus::Todo => counts.todo += 1,
            TaskStatus::InProgress => counts.in_progress += 1,
            TaskStatus::Completed => counts.completed += 1,
        }
    }
    counts
}
