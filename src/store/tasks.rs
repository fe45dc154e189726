use serde::{Deserialize, Serialize};

use crate::models::{Attachment, NewTask, Task, TaskPatch, TaskStatus, Timestamp};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TasksState {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub selected_tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TasksAction {
    Add { id: String, task: NewTask },
    Update { id: String, patch: TaskPatch },
    Delete(String),
    DeleteMany(Vec<String>),
    SetStatus { id: String, status: TaskStatus },
    SetStatusMany { ids: Vec<String>, status: TaskStatus },
    Reorder { status: TaskStatus, ids: Vec<String> },
    ToggleSelection(String),
    ClearSelection,
    SelectAll,
    AddAttachment { task_id: String, attachment: Attachment },
    RemoveAttachment { task_id: String, attachment_id: String },
}

impl TasksAction {
    /// Builds an `Add` with a freshly generated id.
    pub fn add(task: NewTask) -> Self {
        TasksAction::Add {
            id: uuid::Uuid::new_v4().to_string(),
            task,
        }
    }
}

impl TasksState {
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Tasks of one status column in display order.
    pub fn column(&self, status: TaskStatus) -> Vec<&Task> {
        let mut column: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| task.status == status)
            .collect();
        column.sort_by_key(|task| task.order);
        column
    }

    pub fn column_ids(&self, status: TaskStatus) -> Vec<String> {
        self.column(status)
            .into_iter()
            .map(|task| task.id.clone())
            .collect()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_tasks.iter().any(|selected| selected == id)
    }

    fn next_order(&self, status: TaskStatus) -> i64 {
        self.tasks
            .iter()
            .filter(|task| task.status == status)
            .map(|task| task.order)
            .max()
            .unwrap_or(-1)
            + 1
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    /// Re-assigns `0..n` ranks to a column, keeping its current relative order.
    /// Ties keep their position in the task list.
    fn rerank(&mut self, status: TaskStatus) {
        let mut indices: Vec<usize> = (0..self.tasks.len())
            .filter(|&index| self.tasks[index].status == status)
            .collect();
        indices.sort_by_key(|&index| self.tasks[index].order);
        for (rank, index) in indices.into_iter().enumerate() {
            self.tasks[index].order = rank as i64;
        }
    }

    /// Moves one task to the end of `status`, closing the gap it leaves behind.
    fn move_to_end(&mut self, id: &str, status: TaskStatus, now: Timestamp) {
        let next_order = self.next_order(status);
        let Some(task) = self.find_mut(id) else {
            return;
        };
        let source = task.status;
        task.status = status;
        task.order = next_order;
        task.updated_at = now;
        if source != status {
            self.rerank(source);
        }
        self.rerank(status);
    }
}

pub fn reduce(state: &mut TasksState, action: TasksAction, now: Timestamp) {
    match action {
        TasksAction::Add { id, task } => {
            let order = state.next_order(task.status);
            state.tasks.push(Task {
                id,
                title: task.title,
                description: task.description,
                status: task.status,
                category: task.category,
                due_date: task.due_date,
                created_at: now,
                updated_at: now,
                attachments: task.attachments,
                order,
            });
        }
        TasksAction::Update { id, mut patch } => {
            // A status change through the form behaves like a column move.
            let moved_to = match (state.get(&id), patch.status.take()) {
                (Some(task), Some(status)) if task.status != status => Some(status),
                _ => None,
            };
            let Some(task) = state.find_mut(&id) else {
                return;
            };
            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(description) = patch.description {
                task.description = description;
            }
            if let Some(category) = patch.category {
                task.category = category;
            }
            if let Some(due_date) = patch.due_date {
                task.due_date = due_date;
            }
            task.updated_at = now;
            if let Some(status) = moved_to {
                state.move_to_end(&id, status, now);
            }
        }
        TasksAction::Delete(id) => {
            let Some(status) = state.get(&id).map(|task| task.status) else {
                return;
            };
            state.tasks.retain(|task| task.id != id);
            state.selected_tasks.retain(|selected| selected != &id);
            state.rerank(status);
        }
        TasksAction::DeleteMany(ids) => {
            state.tasks.retain(|task| !ids.contains(&task.id));
            state.selected_tasks.clear();
            for status in TaskStatus::ALL {
                state.rerank(status);
            }
        }
        TasksAction::SetStatus { id, status } => {
            state.move_to_end(&id, status, now);
        }
        TasksAction::SetStatusMany { ids, status } => {
            let mut sources = Vec::new();
            for id in &ids {
                if let Some(task) = state.find_mut(id) {
                    if task.status != status && !sources.contains(&task.status) {
                        sources.push(task.status);
                    }
                    task.status = status;
                    task.updated_at = now;
                }
            }
            state.rerank(status);
            for source in sources {
                state.rerank(source);
            }
        }
        TasksAction::Reorder { status, ids } => {
            let listed = ids.len() as i64;
            let mut sources = Vec::new();
            for (index, id) in ids.iter().enumerate() {
                if let Some(task) = state.find_mut(id) {
                    if task.status != status && !sources.contains(&task.status) {
                        sources.push(task.status);
                    }
                    task.status = status;
                    task.order = index as i64;
                    task.updated_at = now;
                }
            }
            // Column members missing from the list keep their relative order after the listed ones.
            for task in state.tasks.iter_mut() {
                if task.status == status && !ids.contains(&task.id) {
                    task.order += listed;
                }
            }
            state.rerank(status);
            for source in sources {
                state.rerank(source);
            }
        }
        TasksAction::ToggleSelection(id) => {
            if state.is_selected(&id) {
                state.selected_tasks.retain(|selected| selected != &id);
            } else {
                state.selected_tasks.push(id);
            }
        }
        TasksAction::ClearSelection => state.selected_tasks.clear(),
        TasksAction::SelectAll => {
            state.selected_tasks = state.tasks.iter().map(|task| task.id.clone()).collect();
        }
        TasksAction::AddAttachment {
            task_id,
            attachment,
        } => {
            if let Some(task) = state.find_mut(&task_id) {
                task.attachments.push(attachment);
                task.updated_at = now;
            }
        }
        TasksAction::RemoveAttachment {
            task_id,
            attachment_id,
        } => {
            if let Some(task) = state.find_mut(&task_id) {
                task.attachments
                    .retain(|attachment| attachment.id != attachment_id);
                task.updated_at = now;
            }
        }
    }
}
