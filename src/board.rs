//! Board drag-and-drop as an explicit two-state machine.
//!
//! A drop never touches the store directly: [`transition`] returns the actions
//! the board should dispatch, so the machine can be driven and checked without
//! a live store.

use crate::models::TaskStatus;
use crate::store::{Action, ActivityAction, TasksAction, TasksState};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { active_id: String },
}

/// Where a dragged card was released: a column, and the card under the pointer
/// if it was released over one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub container: TaskStatus,
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Start { task_id: String },
    /// `None` when released outside any column.
    Drop { over: Option<DropTarget> },
    Cancel,
}

pub fn transition(
    state: &DragState,
    event: DragEvent,
    tasks: &TasksState,
) -> (DragState, Vec<Action>) {
    match (state, event) {
        (_, DragEvent::Start { task_id }) => (DragState::Dragging { active_id: task_id }, Vec::new()),
        (_, DragEvent::Cancel) => (DragState::Idle, Vec::new()),
        (DragState::Idle, DragEvent::Drop { .. }) => (DragState::Idle, Vec::new()),
        (DragState::Dragging { active_id }, DragEvent::Drop { over }) => {
            let actions = match over {
                Some(target) => drop_actions(active_id, &target, tasks),
                None => Vec::new(),
            };
            (DragState::Idle, actions)
        }
    }
}

fn drop_actions(active_id: &str, target: &DropTarget, tasks: &TasksState) -> Vec<Action> {
    let Some(active) = tasks.get(active_id) else {
        return Vec::new();
    };

    if active.status != target.container {
        let status = target.container;
        log::debug!("board move task={active_id} to={status}");
        return vec![
            TasksAction::SetStatus {
                id: active_id.to_string(),
                status,
            }
            .into(),
            ActivityAction::add(
                active_id,
                "Status Changed",
                format!("Status changed to {status}"),
            )
            .into(),
        ];
    }

    // Same column: released over the column body means "no move".
    let Some(over_id) = target.task_id.as_deref() else {
        return Vec::new();
    };
    let ids = tasks.column_ids(active.status);
    let old_index = ids.iter().position(|id| id == active_id);
    let new_index = ids.iter().position(|id| id == over_id);
    match (old_index, new_index) {
        (Some(from), Some(to)) if from != to => vec![TasksAction::Reorder {
            status: active.status,
            ids: array_move(ids, from, to),
        }
        .into()],
        _ => Vec::new(),
    }
}

/// Removes the element at `from` and reinserts it at `to`.
pub fn array_move<T>(mut items: Vec<T>, from: usize, to: usize) -> Vec<T> {
    if from >= items.len() || to >= items.len() {
        return items;
    }
    let item = items.remove(from);
    items.insert(to, item);
    items
}
