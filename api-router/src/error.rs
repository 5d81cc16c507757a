use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::error::{AppError, ExtractionError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Too many requests")]
    RateLimited {
        retry_after_seconds: i64,
        remaining: u32,
        reset_unix: i64,
    },
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => Self::NotFound(msg),
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::Auth(msg) => Self::Unauthorized(msg),
            // The provider message is already written for end users; the raw
            // failure was logged where it happened.
            AppError::Provider(msg) => Self::ProviderError(msg),
            AppError::Extraction(ExtractionError::SizeLimit { limit, actual }) => {
                Self::PayloadTooLarge(format!(
                    "File is {actual} bytes which exceeds the {limit} byte limit"
                ))
            }
            AppError::Extraction(extraction) => Self::ValidationError(extraction.to_string()),
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::RateLimited {
                retry_after_seconds,
                remaining,
                reset_unix,
            } => {
                let body = ErrorResponse {
                    error: format!(
                        "Too many requests. Please try again in {retry_after_seconds} seconds."
                    ),
                    status: "error".to_string(),
                };
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [
                        ("X-RateLimit-Remaining", remaining.to_string()),
                        ("X-RateLimit-Reset", reset_unix.to_string()),
                        (header::RETRY_AFTER.as_str(), retry_after_seconds.to_string()),
                    ],
                    Json(body),
                )
                    .into_response();
            }
            Self::InternalError(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
            Self::ValidationError(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
            Self::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
            Self::PayloadTooLarge(message) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
            Self::ProviderError(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: message,
                    status: "error".to_string(),
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::error::AppError;
    use std::fmt::Debug;

    // Helper to check status code
    fn assert_status_code<T: IntoResponse + Debug>(response: T, expected_status: StatusCode) {
        let response = response.into_response();
        assert_eq!(response.status(), expected_status);
    }

    #[test]
    fn test_app_error_to_api_error_conversion() {
        let not_found = AppError::NotFound("resource not found".to_string());
        let api_error = ApiError::from(not_found);
        assert!(matches!(api_error, ApiError::NotFound(msg) if msg == "resource not found"));

        let validation = AppError::Validation("invalid input".to_string());
        let api_error = ApiError::from(validation);
        assert!(matches!(api_error, ApiError::ValidationError(msg) if msg == "invalid input"));

        let auth = AppError::Auth("unauthorized".to_string());
        let api_error = ApiError::from(auth);
        assert!(matches!(api_error, ApiError::Unauthorized(msg) if msg == "unauthorized"));

        let provider = AppError::Provider("please try again".to_string());
        let api_error = ApiError::from(provider);
        assert!(matches!(api_error, ApiError::ProviderError(msg) if msg == "please try again"));

        let internal_error =
            AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, "io error"));
        let api_error = ApiError::from(internal_error);
        assert!(matches!(api_error, ApiError::InternalError(_)));
    }

    #[test]
    fn test_extraction_errors_map_to_client_errors() {
        let too_large = AppError::Extraction(ExtractionError::SizeLimit {
            limit: 10,
            actual: 20,
        });
        assert!(matches!(
            ApiError::from(too_large),
            ApiError::PayloadTooLarge(_)
        ));

        let unsupported =
            AppError::Extraction(ExtractionError::UnsupportedType("exe".to_string()));
        assert!(matches!(
            ApiError::from(unsupported),
            ApiError::ValidationError(_)
        ));
    }

    #[test]
    fn test_api_error_response_status_codes() {
        let error = ApiError::InternalError("server error".to_string());
        assert_status_code(error, StatusCode::INTERNAL_SERVER_ERROR);

        let error = ApiError::NotFound("not found".to_string());
        assert_status_code(error, StatusCode::NOT_FOUND);

        let error = ApiError::ValidationError("invalid input".to_string());
        assert_status_code(error, StatusCode::BAD_REQUEST);

        let error = ApiError::Unauthorized("not allowed".to_string());
        assert_status_code(error, StatusCode::UNAUTHORIZED);

        let error = ApiError::PayloadTooLarge("too big".to_string());
        assert_status_code(error, StatusCode::PAYLOAD_TOO_LARGE);

        let error = ApiError::ProviderError("try later".to_string());
        assert_status_code(error, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limited_response_carries_headers() {
        let error = ApiError::RateLimited {
            retry_after_seconds: 30,
            remaining: 0,
            reset_unix: 1_700_000_000,
        };
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers.get("X-RateLimit-Remaining").unwrap(), "0");
        assert_eq!(headers.get("X-RateLimit-Reset").unwrap(), "1700000000");
        assert_eq!(headers.get("Retry-After").unwrap(), "30");
    }

    #[test]
    fn test_internal_error_sanitization() {
        let sensitive_info = "db password incorrect";
        let api_error = ApiError::InternalError(sensitive_info.to_string());

        assert_eq!(api_error.to_string(), "Internal server error");
        assert_status_code(api_error, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
