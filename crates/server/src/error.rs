use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{DbErr, TransientError, models::task_label::TaskLabelError};
use deployment::DeploymentError;
use sea_orm::SqlErr;
use services::services::{
    attachments::AttachmentError, board::BoardError, demo::DemoError,
    project::ProjectServiceError, workspace::WorkspaceServiceError,
};
use thiserror::Error;
use utils::response::ApiResponse;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Demo(#[from] DemoError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    TaskLabel(#[from] TaskLabelError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session ID required")]
    SessionRequired,
    #[error("Invalid or expired session")]
    SessionInvalid,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl TransientError for ApiError {
    fn is_transient(&self) -> bool {
        matches!(self, ApiError::Database(err) if err.is_transient())
    }
}

fn database_outcome(err: &DbErr) -> (StatusCode, &'static str, String) {
    match err {
        DbErr::RecordNotFound(msg) => (StatusCode::NOT_FOUND, "DatabaseError", msg.clone()),
        _ if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => (
            StatusCode::CONFLICT,
            "DatabaseError",
            "Resource already exists".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "DatabaseError",
            INTERNAL_MESSAGE.to_string(),
        ),
    }
}

impl ApiError {
    fn outcome(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Board(err) => match err {
                BoardError::Database(db_err) => database_outcome(db_err),
                BoardError::NotFound(_) => (StatusCode::NOT_FOUND, "BoardError", err.to_string()),
                BoardError::Validation(msg) => (StatusCode::BAD_REQUEST, "BoardError", msg.clone()),
            },
            ApiError::Demo(err) => match err {
                DemoError::Database(db_err) => database_outcome(db_err),
                DemoError::MissingToken | DemoError::TokenTooLong => {
                    (StatusCode::BAD_REQUEST, "DemoError", err.to_string())
                }
            },
            ApiError::Attachment(err) => match err {
                AttachmentError::Database(db_err) => database_outcome(db_err),
                AttachmentError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "AttachmentError", err.to_string())
                }
                AttachmentError::TooLarge { .. } => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "AttachmentError", err.to_string())
                }
                AttachmentError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "AttachmentError", msg.clone())
                }
                AttachmentError::Io(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AttachmentError",
                    INTERNAL_MESSAGE.to_string(),
                ),
            },
            ApiError::TaskLabel(err) => match err {
                TaskLabelError::Database(db_err) => database_outcome(db_err),
                TaskLabelError::AlreadyAttached => {
                    (StatusCode::CONFLICT, "TaskLabelError", err.to_string())
                }
                TaskLabelError::NotAttached => {
                    (StatusCode::NOT_FOUND, "TaskLabelError", err.to_string())
                }
            },
            ApiError::Deployment(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DeploymentError",
                INTERNAL_MESSAGE.to_string(),
            ),
            ApiError::Database(db_err) => database_outcome(db_err),
            ApiError::Multipart(err) => {
                let status = err.status();
                let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "File is too large".to_string()
                } else {
                    "Failed to upload file. Please ensure the file is valid and try again."
                        .to_string()
                };
                (status, "MultipartError", message)
            }
            ApiError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IoError",
                INTERNAL_MESSAGE.to_string(),
            ),
            ApiError::SessionRequired => (
                StatusCode::BAD_REQUEST,
                "SessionRequired",
                "Session ID required".to_string(),
            ),
            ApiError::SessionInvalid => (
                StatusCode::UNAUTHORIZED,
                "SessionInvalid",
                "Invalid or expired session".to_string(),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "Unauthorized. Please sign in again.".to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg.clone()),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                INTERNAL_MESSAGE.to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BadRequest", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "ConflictError", msg.clone()),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge", msg.clone())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type, error_message) = self.outcome();

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        } else {
            tracing::debug!(status = %status_code, error_type, error = %self, "API request rejected");
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

impl From<ProjectServiceError> for ApiError {
    fn from(err: ProjectServiceError) -> Self {
        match err {
            ProjectServiceError::Database(db_err) => ApiError::Database(db_err),
            ProjectServiceError::WorkspaceNotFound => {
                ApiError::NotFound("Workspace not found".to_string())
            }
            ProjectServiceError::Validation(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl From<WorkspaceServiceError> for ApiError {
    fn from(err: WorkspaceServiceError) -> Self {
        match err {
            WorkspaceServiceError::Database(db_err) => ApiError::Database(db_err),
            WorkspaceServiceError::Validation(msg) => ApiError::BadRequest(msg),
            WorkspaceServiceError::SlugTaken => ApiError::Conflict(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use sea_orm::RuntimeErr;

    use super::*;

    async fn message_of(err: ApiError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        (status, json["message"].as_str().unwrap_or_default().to_string())
    }

    #[test]
    fn api_error_maps_to_expected_http_statuses() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::SessionInvalid.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::SessionRequired.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("conflict".to_string())
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("boom".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn domain_errors_carry_client_messages() {
        assert_eq!(
            message_of(BoardError::NotFound("Task").into()).await,
            (StatusCode::NOT_FOUND, "Task not found".to_string())
        );
        assert_eq!(
            message_of(TaskLabelError::AlreadyAttached.into()).await,
            (
                StatusCode::CONFLICT,
                "Label already attached to this task".to_string()
            )
        );
        assert_eq!(
            message_of(AttachmentError::TooLarge { max: 10 }.into()).await.0,
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            message_of(ApiError::Unauthorized).await.1,
            "Unauthorized. Please sign in again."
        );
        assert_eq!(
            message_of(DbErr::RecordNotFound("Label not found".to_string()).into()).await,
            (StatusCode::NOT_FOUND, "Label not found".to_string())
        );
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let err = DbErr::Conn(RuntimeErr::Internal("secret dsn".to_string()));
        let (status, message) = message_of(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, INTERNAL_MESSAGE);
    }

    #[test]
    fn only_database_errors_are_transient() {
        let reset = DbErr::Conn(RuntimeErr::Internal("connection reset".to_string()));
        assert!(ApiError::Database(reset).is_transient());
        assert!(!ApiError::NotFound("Task not found".to_string()).is_transient());
    }
}
