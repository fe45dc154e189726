use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use super::validation::FieldError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed ({} errors)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("task not found")]
    NotFound,
    #[error("no token, authorization denied")]
    Unauthorized,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                log::debug!("rejecting request with {} field errors", errors.len());
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "errors": errors })),
                )
                    .into_response()
            }
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Task not found" })),
            )
                .into_response(),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "No token, authorization denied" })),
            )
                .into_response(),
            ApiError::Storage(err) => {
                log::error!("request failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
            ApiError::Internal(message) => {
                log::error!("request failed: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::validation::Location;

    #[test]
    fn status_codes_follow_error_kind() {
        let validation = ApiError::Validation(vec![FieldError::new(
            Location::Body,
            "title",
            "Title is required",
            None,
        )]);
        assert_eq!(
            validation.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        assert_eq!(
            ApiError::from(StorageError::from(io)).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
