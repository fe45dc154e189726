use serde::{Deserialize, Serialize};

use crate::models::{Activity, Timestamp};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActivityState {
    #[serde(default)]
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActivityAction {
    Add {
        id: String,
        task_id: String,
        action: String,
        details: Option<String>,
    },
    /// Drops every entry recorded for one task.
    Clear(String),
}

impl ActivityAction {
    pub fn add(task_id: &str, action: &str, details: impl Into<String>) -> Self {
        ActivityAction::Add {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            action: action.to_string(),
            details: Some(details.into()),
        }
    }
}

impl ActivityState {
    /// Entries for one task, newest first.
    pub fn for_task(&self, task_id: &str) -> Vec<&Activity> {
        let mut entries: Vec<&Activity> = self
            .activities
            .iter()
            .filter(|activity| activity.task_id == task_id)
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }
}

pub fn reduce(state: &mut ActivityState, action: ActivityAction, now: Timestamp) {
    match action {
        ActivityAction::Add {
            id,
            task_id,
            action,
            details,
        } => state.activities.push(Activity {
            id,
            task_id,
            action,
            timestamp: now,
            details,
        }),
        ActivityAction::Clear(task_id) => state
            .activities
            .retain(|activity| activity.task_id != task_id),
    }
}
