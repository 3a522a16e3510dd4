//! Error types for formfill-web
//!
//! Every failure is reported as `{"error": {"code", "message"}}`. Bad input
//! (missing upload, unknown form type, unreadable roster) maps to 400; a
//! missing template or a failed fill maps to 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use formfill_common::Error as CommonError;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// formfill-common error
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Common(err) => match err {
                CommonError::UnknownFormType(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_FORM_TYPE"),
                CommonError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                CommonError::Csv(_) => (StatusCode::BAD_REQUEST, "INVALID_ROSTER"),
                CommonError::TemplateNotFound(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "TEMPLATE_NOT_FOUND")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "GENERATION_FAILED"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        } else {
            tracing::warn!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                CommonError::UnknownFormType("lifeguard".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                CommonError::InvalidInput("empty".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                CommonError::TemplateNotFound("efa.pdf".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CommonError::Internal("boom".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_code().0, expected, "{err}");
        }
    }
}
