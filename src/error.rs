use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the Carousel application
#[derive(Error, Debug)]
pub enum CarouselError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database connection failed: {0}")]
    DatabaseConnection(String),

    // Pool errors
    #[error("No healthy proxies available")]
    NoHealthyProxy,

    #[error("Proxy not found: {id}")]
    ProxyNotFound { id: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Carousel operations
pub type Result<T> = std::result::Result<T, CarouselError>;

impl CarouselError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            CarouselError::InvalidRequest(_) | CarouselError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }

            // 404 Not Found
            CarouselError::ProxyNotFound { .. } => StatusCode::NOT_FOUND,

            // 503 Service Unavailable
            CarouselError::NoHealthyProxy | CarouselError::DatabaseConnection(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 500 Internal Server Error
            CarouselError::Database(_)
            | CarouselError::Io(_)
            | CarouselError::MissingEnvVar(_)
            | CarouselError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// Implement IntoResponse for API error responses
impl IntoResponse for CarouselError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_code_mapping() {
        assert_eq!(
            CarouselError::InvalidRequest("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CarouselError::InvalidConfig("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CarouselError::ProxyNotFound {
                id: "surfshark-nl1".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CarouselError::NoHealthyProxy.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            CarouselError::DatabaseConnection("refused".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            CarouselError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_client_server_helpers() {
        assert!(CarouselError::InvalidRequest("bad".to_string()).is_client_error());
        assert!(!CarouselError::InvalidRequest("bad".to_string()).is_server_error());

        assert!(CarouselError::NoHealthyProxy.is_server_error());
        assert!(!CarouselError::NoHealthyProxy.is_client_error());
    }
}
