use axum::Json;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication credentials were not provided or are invalid.")]
    Unauthorized,
    #[error("You do not have permission to access this task.")]
    Forbidden,
    #[error("Task with ID {0} not found.")]
    TaskNotFound(i64),
    #[error("A user with this email already exists.")]
    UserAlreadyExists,
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UserAlreadyExists => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "unhandled error while serving request");
                ErrorResponse {
                    error: "An unexpected error occurred.".into(),
                    detail: None,
                }
            }
            AppError::UserAlreadyExists => ErrorResponse {
                error: self.to_string(),
                detail: Some(json!({
                    "title": "User Already Exists",
                    "message": self.to_string(),
                })),
            },
            _ => {
                tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
                ErrorResponse {
                    error: self.to_string(),
                    detail: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("password hashing failed: {e}"))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("token encoding failed: {e}"))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 4096).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn not_found_names_the_task() {
        let (status, body) = body_of(AppError::TaskNotFound(7)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Task with ID 7 not found.");
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn conflict_carries_detail() {
        let (status, body) = body_of(AppError::UserAlreadyExists).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["detail"]["title"], "User Already Exists");
    }

    #[tokio::test]
    async fn internal_errors_are_not_leaked() {
        let (status, body) = body_of(AppError::Internal("pool exhausted".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An unexpected error occurred.");
    }
}
