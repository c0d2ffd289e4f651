//! Application error type and its HTTP rendering.
//!
//! Every handler returns `Result<_, AppError>`. The response body always
//! carries an `error` message; business-rule and field-validation failures
//! additionally carry the `non_field_errors` / `field_errors` split that form
//! clients display inline.
//!
//! ```json
//! {
//!   "error": "End date must be greater or equals than Start date",
//!   "non_field_errors": [],
//!   "field_errors": { "end_date": ["End date must be greater or equals than Start date"] }
//! }
//! ```

use std::collections::BTreeMap;

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::validation::BusinessErrors;

/// Errors raised by repository implementations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }
}

/// Structured validation details attached to 400/422 responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ErrorDetails {
    pub non_field_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl From<&BusinessErrors> for ErrorDetails {
    fn from(errors: &BusinessErrors) -> Self {
        Self {
            non_field_errors: errors.non_field_errors(),
            field_errors: errors.field_errors(),
        }
    }
}

impl From<&ValidationErrors> for ErrorDetails {
    fn from(errors: &ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|error| {
                        error
                            .message
                            .as_ref()
                            .map(|msg| msg.to_string())
                            .unwrap_or_else(|| format!("{} is invalid", field))
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        Self {
            non_field_errors: Vec::new(),
            field_errors,
        }
    }
}

/// Body schema of every error response, for the OpenAPI document.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_field_errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
    pub details: Option<ErrorDetails>,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
            details: None,
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    /// A business-rule rejection: 400 with the field/non-field split.
    pub fn business(errors: BusinessErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            details: Some(ErrorDetails::from(&errors)),
            error: errors.into(),
        }
    }

    /// A `validator` derive rejection: 422 with per-field messages.
    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            details: Some(ErrorDetails::from(&errors)),
            error: errors.into(),
        }
    }

    pub fn repository(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => Self::not_found(err),
            RepositoryError::Conflict(_) => Self::bad_request(err),
            RepositoryError::Database(_) => Self::internal(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status.as_u16(), error = %self.error, "Request failed");
        }

        let body = match self.details {
            Some(details) => Json(json!({
                "error": self.error.to_string(),
                "non_field_errors": details.non_field_errors,
                "field_errors": details.field_errors,
            })),
            None => Json(json!({
                "error": self.error.to_string()
            })),
        };

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        let error: Error = err.into();

        let error = match error.downcast::<BusinessErrors>() {
            Ok(errors) => return AppError::business(errors),
            Err(error) => error,
        };
        let error = match error.downcast::<ValidationErrors>() {
            Ok(errors) => return AppError::validation(errors),
            Err(error) => error,
        };
        match error.downcast::<RepositoryError>() {
            Ok(err) => AppError::repository(err),
            Err(error) => AppError::internal(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{FailureKind, ValidationFailure};
    use anyhow::anyhow;

    #[test]
    fn test_business_errors_map_to_bad_request_with_details() {
        let errors = BusinessErrors::new(vec![
            ValidationFailure::field(FailureKind::DateOrder, "end_date", "bad order"),
            ValidationFailure::non_field(FailureKind::Loop, "loop"),
        ]);

        let err = AppError::from(errors);

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let details = err.details.unwrap();
        assert_eq!(details.non_field_errors, vec!["loop".to_string()]);
        assert_eq!(
            details.field_errors.get("end_date"),
            Some(&vec!["bad order".to_string()])
        );
    }

    #[test]
    fn test_repository_not_found_maps_to_404() {
        let err = AppError::from(RepositoryError::not_found("Academic event"));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.error.to_string(), "Academic event not found");
    }

    #[test]
    fn test_plain_errors_map_to_500() {
        let err = AppError::from(anyhow!("boom"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.details.is_none());
    }

    #[test]
    fn test_explicit_constructors_keep_status() {
        assert_eq!(
            AppError::bad_request(anyhow!("x")).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::unprocessable(anyhow!("x")).status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
