use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

use convene_types::api::{ErrorResponse, FieldError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("You are not allowed to modify this resource")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Store errors become `Conflict` when they are uniqueness violations and
/// `Internal` otherwise.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if convene_db::is_unique_violation(&err) {
            Self::Conflict("Resource already exists".into())
        } else {
            Self::Internal(err)
        }
    }
}

// Extractor rejections are reported in the same JSON shape as every other
// validation failure.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::field("body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::field("query", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::field("path", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            Self::Validation(fields) => {
                debug!(?fields, "Rejected invalid input");
                ErrorResponse {
                    message: "Invalid input".into(),
                    fields: Some(fields),
                }
            }
            Self::Internal(err) => {
                // Details stay in the log; the client gets a fixed message.
                error!(error = ?err, "Internal error");
                ErrorResponse {
                    message: "Internal server error".into(),
                    fields: None,
                }
            }
            other => {
                debug!(status = %status, "{}", other);
                ErrorResponse {
                    message: other.to_string(),
                    fields: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
