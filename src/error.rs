use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::auth::password::{AccessError, SetPasswordError};
use crate::store::StoreError;
use crate::validation::ValidationErrors;

pub const UNIQUE_USERNAME_MSG: &str = "Username must be unique.";

/// Errors surfaced by the core operations. Each maps to one HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("{}", UNIQUE_USERNAME_MSG)]
    UniquenessViolation,
    /// The request body was not JSON of the expected shape.
    #[error(transparent)]
    Body(#[from] JsonRejection),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation => Self::UniquenessViolation,
            StoreError::MissingOwner => Self::NotFound("User not found"),
            StoreError::Other(e) => Self::Internal(e),
        }
    }
}

impl From<SetPasswordError> for AppError {
    fn from(e: SetPasswordError) -> Self {
        match e {
            SetPasswordError::Invalid(field) => Self::Validation(field.into()),
            SetPasswordError::Hash(e) => Self::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            Self::UniquenessViolation => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": [UNIQUE_USERNAME_MSG] })),
            )
                .into_response(),
            Self::Body(rejection) => {
                warn!(error = %rejection, "request body rejected");
                (
                    rejection.status(),
                    Json(json!({ "errors": [rejection.body_text()] })),
                )
                    .into_response()
            }
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid username or password" })),
            )
                .into_response(),
            Self::NotFound(what) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": what }))).into_response()
            }
            Self::Access(e) => {
                error!(error = %e, "write-only field read");
                internal_response()
            }
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                internal_response()
            }
        }
    }
}

fn internal_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldError;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_errors_render_as_list() {
        let mut errors = ValidationErrors::new();
        errors.push(FieldError::TitleRequired);
        errors.push(FieldError::MinutesRequired);
        let res = AppError::from(errors).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(res).await,
            json!({ "errors": ["Title is required.", "Minutes to complete is required."] })
        );
    }

    #[tokio::test]
    async fn unique_violation_maps_to_username_message() {
        let res = AppError::from(StoreError::UniqueViolation).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(res).await, json!({ "errors": [UNIQUE_USERNAME_MSG] }));
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let res = AppError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        assert!(!body.to_string().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn write_only_read_is_a_generic_500() {
        let res = AppError::from(AccessError("password_hash")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        assert_eq!(body, json!({ "error": "Internal server error" }));
        assert!(!body.to_string().contains("password_hash"));
    }

    #[test]
    fn empty_password_becomes_validation_error() {
        let err = AppError::from(SetPasswordError::Invalid(FieldError::PasswordRequired));
        assert!(matches!(err, AppError::Validation(e) if e.contains(FieldError::PasswordRequired)));
    }
}
