//! HTTP Error Mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use enroll_core::EnrollError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// `EnrollError` paired with the status code it is reported as
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: EnrollError,
}

impl ApiError {
    /// Mapping for the webhook endpoint, where upstream failures must be
    /// a 500 so the processor re-delivers
    pub fn webhook(error: EnrollError) -> Self {
        let status = match &error {
            EnrollError::UpstreamUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => status_for(&error),
        };
        Self { status, error }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(error: &EnrollError) -> StatusCode {
    match error {
        EnrollError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        EnrollError::InvalidTier(_)
        | EnrollError::UnknownTier(_)
        | EnrollError::MissingMetadata(_)
        | EnrollError::SignatureInvalid(_)
        | EnrollError::InvalidRequest(_)
        | EnrollError::Json(_) => StatusCode::BAD_REQUEST,
        EnrollError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        EnrollError::AlreadyProcessing { .. } => StatusCode::CONFLICT,
        EnrollError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<EnrollError> for ApiError {
    fn from(error: EnrollError) -> Self {
        Self {
            status: status_for(&error),
            error,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = %self.error, status = %self.status, "Request failed");
        } else {
            tracing::warn!(error = %self.error, status = %self.status, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.error.user_message(),
            code: self.error.code().into(),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EnrollError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED),
            (EnrollError::InvalidTier("expert".into()), StatusCode::BAD_REQUEST),
            (EnrollError::MissingMetadata("user_id"), StatusCode::BAD_REQUEST),
            (EnrollError::SignatureInvalid("x".into()), StatusCode::BAD_REQUEST),
            (EnrollError::upstream("stripe", "down"), StatusCode::BAD_GATEWAY),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status(), expected);
        }
    }

    #[test]
    fn test_webhook_upstream_is_500() {
        let err = ApiError::webhook(EnrollError::upstream("database", "timeout"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::webhook(EnrollError::UnknownTier("expert".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
