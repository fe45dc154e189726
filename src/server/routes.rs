use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use serde_json::{json, Value};

use super::auth::CurrentUser;
use super::error::ApiError;
use super::validation::{self, FieldError, ListQuery, Location};
use super::ApiState;
use crate::models::{TaskDocument, TaskSummary, Timestamp};
use crate::storage::StorageError;

fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Runs a repository call on the blocking pool; mutations write `tasks.json` synchronously.
async fn blocking<T, F>(call: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|err| ApiError::Internal(format!("repository task failed: {err}")))?
        .map_err(ApiError::from)
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::Validation(vec![FieldError::new(
            Location::Body,
            "",
            &rejection.body_text(),
            None,
        )])),
    }
}

pub async fn list_tasks(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TaskDocument>>, ApiError> {
    let query = validation::validate_list_query(query).map_err(ApiError::Validation)?;
    let docs = state.repo.list(&user.id, &query);
    log::debug!("listed {} tasks for user={}", docs.len(), user.id);
    Ok(Json(docs))
}

pub async fn create_task(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskDocument>), ApiError> {
    let body = json_body(body)?;
    let input = validation::validate_create(&body).map_err(ApiError::Validation)?;
    let repo = state.repo.clone();
    let user_id = user.id.clone();
    let doc = blocking(move || repo.create(&user_id, input, now_millis())).await?;
    log::info!("created task id={} user={}", doc.id, user.id);
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn update_task(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TaskDocument>, ApiError> {
    update_by_id(state, user, id, body).await
}

pub async fn delete_task(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    delete_by_id(state, user, id).await
}

/// `/api/tasks/summary` shadows `{id}`; writes there are rejected as a bad id.
pub async fn update_summary_path(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TaskDocument>, ApiError> {
    update_by_id(state, user, "summary".to_string(), body).await
}

pub async fn delete_summary_path(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    delete_by_id(state, user, "summary".to_string()).await
}

async fn update_by_id(
    state: ApiState,
    user: CurrentUser,
    id: String,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TaskDocument>, ApiError> {
    let body = json_body(body)?;
    let patch = validation::validate_update(&id, &body).map_err(ApiError::Validation)?;
    let repo = state.repo.clone();
    let (user_id, task_id) = (user.id.clone(), id.clone());
    let doc = blocking(move || repo.update(&user_id, &task_id, patch, now_millis()))
        .await?
        .ok_or(ApiError::NotFound)?;
    log::info!("updated task id={id} user={}", user.id);
    Ok(Json(doc))
}

async fn delete_by_id(
    state: ApiState,
    user: CurrentUser,
    id: String,
) -> Result<Json<Value>, ApiError> {
    let mut errors = Vec::new();
    validation::validate_task_id(&id, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    let repo = state.repo.clone();
    let (user_id, task_id) = (user.id.clone(), id.clone());
    if !blocking(move || repo.delete(&user_id, &task_id)).await? {
        return Err(ApiError::NotFound);
    }
    log::info!("deleted task id={id} user={}", user.id);
    Ok(Json(json!({ "message": "Task deleted" })))
}

pub async fn task_summary(
    State(state): State<ApiState>,
    Extension(user): Extension<CurrentUser>,
) -> Json<TaskSummary> {
    Json(state.repo.summary(&user.id))
}
