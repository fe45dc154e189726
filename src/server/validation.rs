//! Request validation. Failures are reported per field in the
//! `{type, msg, path, location, value}` layout clients already parse.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};

use super::repository::{DocumentPatch, NewDocument, TaskQuery};
use crate::models::{Priority, Timestamp};

const INVALID_VALUE: &str = "Invalid value";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Params,
    Query,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub msg: String,
    pub path: String,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FieldError {
    pub fn new(location: Location, path: &str, msg: &str, value: Option<&Value>) -> Self {
        Self {
            kind: "field",
            msg: msg.to_string(),
            path: path.to_string(),
            location,
            value: value.cloned(),
        }
    }
}

/// Parses an ISO 8601 date or date-time. Values without an offset are read as UTC.
pub fn parse_due_date(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

pub fn validate_task_id(id: &str, errors: &mut Vec<FieldError>) {
    if uuid::Uuid::parse_str(id).is_err() {
        errors.push(FieldError::new(
            Location::Params,
            "id",
            "Invalid task ID",
            Some(&Value::String(id.to_string())),
        ));
    }
}

fn empty_body() -> &'static Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    EMPTY.get_or_init(Map::new)
}

fn body_fields(body: &Value) -> &Map<String, Value> {
    body.as_object().unwrap_or(empty_body())
}

fn non_empty_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// `None` when absent, `Some(None)` for an explicit null.
fn nullable_string(
    fields: &Map<String, Value>,
    key: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Option<String>> {
    match fields.get(key)? {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        other => {
            errors.push(FieldError::new(Location::Body, key, INVALID_VALUE, Some(other)));
            None
        }
    }
}

fn tags(fields: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<Vec<String>> {
    let value = fields.get("tags")?;
    match value {
        Value::Null => Some(Vec::new()),
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => {
            let tags: Option<Vec<String>> = items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect();
            if tags.is_none() {
                errors.push(FieldError::new(Location::Body, "tags", INVALID_VALUE, Some(value)));
            }
            tags
        }
        other => {
            errors.push(FieldError::new(Location::Body, "tags", INVALID_VALUE, Some(other)));
            None
        }
    }
}

fn is_completed(fields: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<bool> {
    let value = fields.get("isCompleted")?;
    match value.as_bool() {
        Some(flag) => Some(flag),
        None => {
            errors.push(FieldError::new(
                Location::Body,
                "isCompleted",
                INVALID_VALUE,
                Some(value),
            ));
            None
        }
    }
}

fn priority(
    fields: &Map<String, Value>,
    msg: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Priority> {
    let value = fields.get("priority")?;
    let parsed = value.as_str().and_then(Priority::parse);
    if parsed.is_none() {
        errors.push(FieldError::new(Location::Body, "priority", msg, Some(value)));
    }
    parsed
}

fn due_date(
    fields: &Map<String, Value>,
    msg: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Timestamp> {
    let value = fields.get("dueDate")?;
    let parsed = value.as_str().and_then(parse_due_date);
    if parsed.is_none() {
        errors.push(FieldError::new(Location::Body, "dueDate", msg, Some(value)));
    }
    parsed
}

pub fn validate_create(body: &Value) -> Result<NewDocument, Vec<FieldError>> {
    let fields = body_fields(body);
    let mut errors = Vec::new();

    let title = fields.get("title").and_then(non_empty_string);
    if title.is_none() {
        errors.push(FieldError::new(
            Location::Body,
            "title",
            "Title is required",
            fields.get("title"),
        ));
    }
    let priority = priority(fields, "Priority must be High, Medium or Low", &mut errors);
    let due_date = due_date(fields, "Due date must be a valid date", &mut errors);
    let description = nullable_string(fields, "description", &mut errors).flatten();
    let category = nullable_string(fields, "category", &mut errors).flatten();
    let tags = tags(fields, &mut errors).unwrap_or_default();
    let is_completed = is_completed(fields, &mut errors).unwrap_or(false);

    match title {
        Some(title) if errors.is_empty() => Ok(NewDocument {
            title,
            description,
            category,
            tags,
            priority: priority.unwrap_or_default(),
            due_date,
            is_completed,
        }),
        _ => Err(errors),
    }
}

/// Validates the path id and the body together so both are reported at once.
pub fn validate_update(id: &str, body: &Value) -> Result<DocumentPatch, Vec<FieldError>> {
    let fields = body_fields(body);
    let mut errors = Vec::new();
    validate_task_id(id, &mut errors);

    let title = match fields.get("title") {
        None => None,
        Some(value) => {
            let title = non_empty_string(value);
            if title.is_none() {
                errors.push(FieldError::new(
                    Location::Body,
                    "title",
                    "Title cannot be empty",
                    Some(value),
                ));
            }
            title
        }
    };
    let patch = DocumentPatch {
        title,
        priority: priority(fields, "Invalid priority", &mut errors),
        due_date: due_date(fields, "Invalid date format for dueDate", &mut errors),
        description: nullable_string(fields, "description", &mut errors),
        category: nullable_string(fields, "category", &mut errors),
        tags: tags(fields, &mut errors),
        is_completed: is_completed(fields, &mut errors),
    };

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

#[derive(Debug, Default, Clone, serde::Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

pub fn validate_list_query(query: ListQuery) -> Result<TaskQuery, Vec<FieldError>> {
    let completed = match query.status.as_deref() {
        None | Some("") => None,
        Some("completed") => Some(true),
        Some("pending") => Some(false),
        Some(other) => {
            return Err(vec![FieldError::new(
                Location::Query,
                "status",
                "Status must be \"completed\" or \"pending\"",
                Some(&Value::String(other.to_string())),
            )])
        }
    };
    Ok(TaskQuery {
        category: query.category.filter(|c| !c.is_empty()),
        completed,
        search: query.search.filter(|s| !s.is_empty()),
    })
}
