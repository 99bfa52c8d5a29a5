//! Error taxonomy shared by every handler.
//!
//! Repositories return `anyhow::Result`; handlers return `Result<_, AppError>`. The
//! `From<anyhow::Error>` conversion recovers an `AppError` raised inside a repository and
//! classifies raw database errors, so `?` works across the whole stack.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::identity::IdentityError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, malformed or expired credentials, or an identity with no local account.
    #[error("{0}")]
    Unauthorized(String),

    /// Valid identity, but the role or ownership scope does not allow the operation.
    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// The identity provider failed during an operation that cannot proceed without it.
    #[error("identity provider error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

/// One failed field in a validation error.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn fields(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self::Validation {
            message: message.into(),
            details: serde_json::to_value(errors).ok(),
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn from_db_err(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return Self::Conflict(format!("Resource already exists: {}", detail));
        }
        if let Some(SqlErr::ForeignKeyConstraintViolation(detail)) = err.sql_err() {
            return Self::Conflict(format!("Resource is still referenced: {}", detail));
        }
        match err {
            DbErr::RecordNotFound(message) => Self::NotFound(message),
            other => Self::Internal(other.into()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<AppError>() {
            Ok(app_err) => return app_err,
            Err(err) => err,
        };
        match err.downcast::<DbErr>() {
            Ok(db_err) => Self::from_db_err(db_err),
            Err(err) => Self::Internal(err),
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        Self::from_db_err(err)
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::MissingToken | IdentityError::InvalidToken(_) => {
                Self::Unauthorized(err.to_string())
            }
            IdentityError::EmailExists(email) => {
                Self::Conflict(format!("An account with email {} already exists", email))
            }
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Validation { message, details } => ErrorResponse {
                error: message,
                details,
            },
            Self::Internal(err) => {
                tracing::error!(error = ?err, "Unhandled error while serving request");
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    details: None,
                }
            }
            Self::Upstream(message) => {
                tracing::warn!("Identity provider failure: {}", message);
                ErrorResponse {
                    error: "Identity provider request failed".to_string(),
                    details: None,
                }
            }
            other => ErrorResponse {
                error: other.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Upstream("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_validation_body_carries_field_details() {
        let err = AppError::fields(
            "Invalid request",
            vec![FieldError {
                field: "email".to_string(),
                message: "must be a valid email".to_string(),
            }],
        );
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request");
        assert_eq!(body["details"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused at 10.0.0.3"));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_anyhow_roundtrip_keeps_app_error() {
        let wrapped: anyhow::Error = AppError::conflict("Fee is already paid").into();
        match AppError::from(wrapped) {
            AppError::Conflict(message) => assert_eq!(message, "Fee is already paid"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_record_not_found_maps_to_404() {
        let wrapped: anyhow::Error = DbErr::RecordNotFound("Fee not found".to_string()).into();
        assert_eq!(AppError::from(wrapped).status_code(), StatusCode::NOT_FOUND);
    }
}
