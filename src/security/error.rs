//! Admission failures and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Why a request was stopped before (or while) reaching business logic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// Window quota exhausted. Retryable after `retry_after` seconds.
    #[error("{message}")]
    RateLimitExceeded { message: String, retry_after: u64 },

    /// No `X-API-Key` header on a key-required endpoint.
    #[error("API key required. Add X-API-Key header to your request.")]
    MissingApiKey { hint: Option<String> },

    #[error("Invalid API key.")]
    InvalidApiKey,

    /// Origin/Referer not on the allow-list.
    #[error("Request origin not allowed")]
    OriginRejected,

    /// The internal secret is missing from server configuration.
    #[error("Internal API not configured")]
    InternalSecretNotConfigured,

    /// Internal secret absent or wrong.
    #[error("Unauthorized")]
    Unauthorized,

    /// The wrapped handler failed after admission. The detail is logged only.
    #[error("Internal server error")]
    HandlerFailure(String),
}

impl AdmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            AdmissionError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AdmissionError::MissingApiKey { .. }
            | AdmissionError::InvalidApiKey
            | AdmissionError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdmissionError::OriginRejected => StatusCode::FORBIDDEN,
            AdmissionError::InternalSecretNotConfigured | AdmissionError::HandlerFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AdmissionError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            AdmissionError::MissingApiKey { .. } => "missing_api_key",
            AdmissionError::InvalidApiKey => "invalid_api_key",
            AdmissionError::OriginRejected => "origin_rejected",
            AdmissionError::InternalSecretNotConfigured => "server_misconfigured",
            AdmissionError::Unauthorized => "unauthorized",
            AdmissionError::HandlerFailure(_) => "handler_failure",
        }
    }

    fn body(&self) -> ErrorBody {
        let (hint, retry_after) = match self {
            AdmissionError::MissingApiKey { hint } => (hint.clone(), None),
            AdmissionError::RateLimitExceeded { retry_after, .. } => (None, Some(*retry_after)),
            _ => (None, None),
        };

        ErrorBody {
            success: false,
            error: self.to_string(),
            hint,
            retry_after,
        }
    }
}

/// JSON body shared by every response the admission layer writes itself.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        if let AdmissionError::HandlerFailure(detail) = &self {
            tracing::error!(error = %detail, "Handler failed after admission");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_body_shape() {
        let err = AdmissionError::RateLimitExceeded {
            message: "slow down".into(),
            retry_after: 42,
        };
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"success": false, "error": "slow down", "retryAfter": 42})
        );
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_handler_failure_hides_detail() {
        let err = AdmissionError::HandlerFailure("db password wrong".into());
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"success": false, "error": "Internal server error"})
        );
    }

    #[test]
    fn test_missing_key_carries_hint() {
        let err = AdmissionError::MissingApiKey {
            hint: Some("Get your API key at https://example.com/api-keys".into()),
        };
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["hint"], "Get your API key at https://example.com/api-keys");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
