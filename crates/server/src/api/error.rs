//! Domain error -> HTTP response mapping.

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use seedarr_core::{DownloadError, EngineError, IndexerConfigError, SearchError};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexer_errors: Option<HashMap<String, String>>,
}

/// A failed request: status plus `{ "error": ... }` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: message.into(),
                indexer_errors: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    fn internal(message: String) -> Self {
        error!(error = %message, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        let message = e.to_string();
        match e {
            SearchError::NotConfigured(_) | SearchError::InvalidQuery(_) => {
                Self::bad_request(message)
            }
            SearchError::ConnectionFailed(_) | SearchError::ApiError(_) => {
                Self::new(StatusCode::BAD_GATEWAY, message)
            }
            SearchError::Timeout => Self::new(StatusCode::GATEWAY_TIMEOUT, message),
            SearchError::AllIndexersFailed(errors) => Self {
                status: StatusCode::BAD_GATEWAY,
                body: ErrorResponse {
                    error: message,
                    indexer_errors: Some(errors),
                },
            },
            SearchError::Store(_) => Self::internal(message),
        }
    }
}

impl From<IndexerConfigError> for ApiError {
    fn from(e: IndexerConfigError) -> Self {
        match e {
            IndexerConfigError::NotFound(_) => Self::not_found(e.to_string()),
            IndexerConfigError::Database(_) => Self::internal(e.to_string()),
        }
    }
}

impl From<DownloadError> for ApiError {
    fn from(e: DownloadError) -> Self {
        let message = e.to_string();
        match e {
            DownloadError::NotFound(_) => Self::not_found(message),
            DownloadError::InvalidState { .. } | DownloadError::AlreadyExists(_) => {
                Self::new(StatusCode::CONFLICT, message)
            }
            DownloadError::Validation(_) | DownloadError::Engine(EngineError::InvalidUri(_)) => {
                Self::bad_request(message)
            }
            DownloadError::Engine(EngineError::MetadataTimeout(_)) | DownloadError::Timeout(_) => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, message)
            }
            DownloadError::Engine(_) => Self::new(StatusCode::BAD_GATEWAY, message),
            DownloadError::Database(_) => Self::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use seedarr_core::DownloadStatus;

    #[test]
    fn test_search_error_statuses() {
        let cases = [
            (SearchError::NotConfigured("x".into()), StatusCode::BAD_REQUEST),
            (SearchError::InvalidQuery("x".into()), StatusCode::BAD_REQUEST),
            (SearchError::ApiError("x".into()), StatusCode::BAD_GATEWAY),
            (SearchError::ConnectionFailed("x".into()), StatusCode::BAD_GATEWAY),
            (SearchError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (
                SearchError::AllIndexersFailed(HashMap::new()),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
    }

    #[test]
    fn test_download_error_statuses() {
        let cases = [
            (DownloadError::NotFound("d".into()), StatusCode::NOT_FOUND),
            (
                DownloadError::InvalidState {
                    id: "d".into(),
                    status: DownloadStatus::Queued,
                    operation: "resume",
                },
                StatusCode::CONFLICT,
            ),
            (
                DownloadError::AlreadyExists("magnet:?xt=urn:btih:a".into()),
                StatusCode::CONFLICT,
            ),
            (DownloadError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                DownloadError::Engine(EngineError::InvalidUri("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                DownloadError::Engine(EngineError::AddFailed("x".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                DownloadError::Timeout(Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                DownloadError::Database("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
    }

    #[test]
    fn test_indexer_config_error_statuses() {
        assert_eq!(
            ApiError::from(IndexerConfigError::NotFound("c".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(IndexerConfigError::Database("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
