// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::services::{AssetError, ContentError, FeedError};
use crate::store::StoreError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    PreconditionFailed(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (feed upstream issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::PreconditionFailed(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::PreconditionFailed(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        ApiError::PreconditionFailed(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout(_) | StoreError::Sqlx(sqlx::Error::PoolTimedOut) | StoreError::Sqlx(sqlx::Error::PoolClosed) => {
                tracing::error!("Document store unavailable: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            StoreError::Filter(filter_err) => ApiError::bad_request(filter_err.to_string()),
            other => {
                // Log the real error but return generic message
                tracing::error!("Document store error: {}", other);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            ContentError::PreconditionFailed(msg) => ApiError::precondition_failed(msg),
            ContentError::Persistence { action, entity, source } => {
                tracing::error!("Failed to {} {}", action, entity);
                ApiError::from(source)
            }
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Upstream { status, body } => {
                tracing::error!("Feed upstream returned {}: {}", status, body);
                ApiError::bad_gateway(format!("Feed upstream returned {}", status))
            }
            FeedError::InvalidBaseUrl(url) => {
                tracing::error!("Feed base URL is unusable: {}", url);
                ApiError::internal_server_error("Feed is not configured")
            }
            other => {
                tracing::error!("Feed request failed: {}", other);
                ApiError::bad_gateway("Feed upstream unavailable")
            }
        }
    }
}

impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::InvalidPath(path) => ApiError::bad_request(format!("Invalid asset path: {}", path)),
            AssetError::NotFound(path) => ApiError::not_found(format!("Asset {} not found", path)),
            AssetError::EmptyUpload => ApiError::bad_request("Upload body is empty"),
            AssetError::Resize(msg) => ApiError::bad_request(format!("Image could not be processed: {}", msg)),
            AssetError::Io(io_err) => {
                tracing::error!("Asset storage error: {}", io_err);
                ApiError::internal_server_error("Asset storage error occurred")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Collection;

    #[test]
    fn content_errors_map_to_statuses() {
        assert_eq!(ApiError::from(ContentError::NotFound("Content item x".into())).status_code(), 404);
        assert_eq!(ApiError::from(ContentError::PreconditionFailed("id mismatch".into())).status_code(), 400);

        let persistence = ContentError::Persistence {
            action: "create",
            entity: "content item",
            source: StoreError::WriteRejected(Collection::ContentItems),
        };
        let api = ApiError::from(persistence);
        assert_eq!(api.status_code(), 500);
        assert!(!api.message().contains("content_items"));
    }

    #[test]
    fn store_timeouts_are_unavailable() {
        let api = ApiError::from(StoreError::Timeout(std::time::Duration::from_secs(1)));
        assert_eq!(api.status_code(), 503);
    }

    #[test]
    fn upstream_failures_are_bad_gateway() {
        let api = ApiError::from(FeedError::Upstream { status: 429, body: "slow down".into() });
        assert_eq!(api.status_code(), 502);
        assert_eq!(api.to_json()["code"], "BAD_GATEWAY");
    }
}
