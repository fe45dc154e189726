//! View-level commands: each one dispatches the store actions a board or list
//! handler would, including the matching activity entries.

use crate::models::{Attachment, NewTask, Task, TaskPatch, TaskStatus};
use crate::store::{Action, ActivityAction, Store, TasksAction};

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn find_task(store: &Store, id: &str) -> Option<Task> {
    store.select(|state| state.tasks.get(id).cloned())
}

pub fn create_task(store: &Store, mut task: NewTask) -> CommandResult<Task> {
    task.title = task.title.trim().to_string();
    if task.title.is_empty() {
        return err("title is required");
    }
    let action = TasksAction::add(task);
    let TasksAction::Add { id, .. } = &action else {
        return err("task not created");
    };
    let id = id.clone();
    store.dispatch(action);
    match find_task(store, &id) {
        Some(task) => ok(task),
        None => err("task not created"),
    }
}

pub fn edit_task(store: &Store, id: &str, patch: TaskPatch) -> CommandResult<Task> {
    if matches!(&patch.title, Some(title) if title.trim().is_empty()) {
        return err("title is required");
    }
    if find_task(store, id).is_none() {
        return err("task not found");
    }
    store.dispatch_all(vec![
        TasksAction::Update {
            id: id.to_string(),
            patch,
        }
        .into(),
        ActivityAction::add(id, "Task Updated", "Task details were updated").into(),
    ]);
    match find_task(store, id) {
        Some(task) => ok(task),
        None => err("task not found"),
    }
}

pub fn change_status(store: &Store, id: &str, status: TaskStatus) -> CommandResult<Task> {
    if find_task(store, id).is_none() {
        return err("task not found");
    }
    store.dispatch_all(vec![
        TasksAction::SetStatus {
            id: id.to_string(),
            status,
        }
        .into(),
        ActivityAction::add(id, "Status Changed", format!("Status changed to {status}")).into(),
    ]);
    match find_task(store, id) {
        Some(task) => ok(task),
        None => err("task not found"),
    }
}

pub fn delete_task(store: &Store, id: &str) -> CommandResult<bool> {
    if find_task(store, id).is_none() {
        return err("task not found");
    }
    store.dispatch(TasksAction::Delete(id.to_string()));
    ok(true)
}

/// Moves every selected task to `status`, logs one entry per task, then clears the selection.
pub fn batch_update_status(store: &Store, status: TaskStatus) -> CommandResult<usize> {
    let selected = store.select(|state| state.tasks.selected_tasks.clone());
    if selected.is_empty() {
        return ok(0);
    }
    let mut actions: Vec<Action> = vec![TasksAction::SetStatusMany {
        ids: selected.clone(),
        status,
    }
    .into()];
    for id in &selected {
        actions.push(
            ActivityAction::add(
                id,
                "Status Changed",
                format!("Status changed to {status} (batch update)"),
            )
            .into(),
        );
    }
    actions.push(TasksAction::ClearSelection.into());
    store.dispatch_all(actions);
    log::info!("batch status update count={} to={status}", selected.len());
    ok(selected.len())
}

pub fn batch_delete(store: &Store) -> CommandResult<usize> {
    let selected = store.select(|state| state.tasks.selected_tasks.clone());
    if selected.is_empty() {
        return ok(0);
    }
    store.dispatch(TasksAction::DeleteMany(selected.clone()));
    log::info!("batch delete count={}", selected.len());
    ok(selected.len())
}

/// The "select all" checkbox: clears when every visible row is selected, else selects all.
pub fn toggle_select_all(store: &Store, visible_count: usize) -> CommandResult<usize> {
    let selected = store.select(|state| state.tasks.selected_tasks.len());
    if selected == visible_count {
        store.dispatch(TasksAction::ClearSelection);
    } else {
        store.dispatch(TasksAction::SelectAll);
    }
    ok(store.select(|state| state.tasks.selected_tasks.len()))
}

pub fn toggle_selection(store: &Store, id: &str) -> CommandResult<bool> {
    store.dispatch(TasksAction::ToggleSelection(id.to_string()));
    ok(store.select(|state| state.tasks.is_selected(id)))
}

/// Text after the last dot, or the whole name when there is none.
fn file_extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_string()
}

pub fn add_attachment(
    store: &Store,
    task_id: &str,
    name: &str,
    url: &str,
) -> CommandResult<Attachment> {
    if find_task(store, task_id).is_none() {
        return err("task not found");
    }
    let attachment = Attachment {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        url: url.to_string(),
        kind: file_extension(name),
    };
    store.dispatch_all(vec![
        TasksAction::AddAttachment {
            task_id: task_id.to_string(),
            attachment: attachment.clone(),
        }
        .into(),
        ActivityAction::add(task_id, "Attachment Added", format!("Added attachment: {name}"))
            .into(),
    ]);
    ok(attachment)
}

pub fn remove_attachment(store: &Store, task_id: &str, attachment_id: &str) -> CommandResult<bool> {
    if find_task(store, task_id).is_none() {
        return err("task not found");
    }
    store.dispatch_all(vec![
        TasksAction::RemoveAttachment {
            task_id: task_id.to_string(),
            attachment_id: attachment_id.to_string(),
        }
        .into(),
        ActivityAction::add(task_id, "Attachment Removed", "Removed an attachment").into(),
    ]);
    ok(true)
}
