//! API error mapping: core error taxonomy -> HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use apprelay_core::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Wrapper giving the core error taxonomy an HTTP shape
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            Error::NotFound { what } => {
                tracing::warn!(what = %what, "Not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Not found", what.clone()),
                )
            }
            Error::AlreadyExists { name } => {
                tracing::warn!(name = %name, "Already exists");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::with_details("Already exists", name.clone()),
                )
            }
            Error::ServiceUnavailable { service, reason } => {
                tracing::error!(service = %service, reason = %reason, "Service unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::with_details("Service unavailable", format!("{service}: {reason}")),
                )
            }
            Error::Protocol { message } => {
                tracing::error!(message = %message, "Remote protocol error");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::with_details("Remote protocol error", message.clone()),
                )
            }
            Error::InvalidEvent { message } => {
                tracing::warn!(message = %message, "Invalid event payload");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Invalid event payload", message.clone()),
                )
            }
            err => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    /// Helper to extract status code and body from a response
    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_not_found_returns_404() {
        let response = ApiError(Error::not_found("build demo:ghost")).into_response();
        let (status, body) = extract_response(response).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Not found");
        assert!(body.details.unwrap().contains("demo:ghost"));
    }

    #[tokio::test]
    async fn test_service_unavailable_returns_502() {
        let response =
            ApiError(Error::service_unavailable("build-service", "refused")).into_response();
        let (status, body) = extract_response(response).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error, "Service unavailable");
    }

    #[tokio::test]
    async fn test_invalid_event_returns_400() {
        let response = ApiError(Error::invalid_event("missing action")).into_response();
        let (status, body) = extract_response(response).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.details.unwrap().contains("missing action"));
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let response = ApiError(Error::bridge("device exploded")).into_response();
        let (status, body) = extract_response(response).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.details.is_none());
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("Test error");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"error\":\"Test error\""));
        assert!(!json.contains("details"));
    }
}
