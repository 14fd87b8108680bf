// Error types for the CatPaw framework

use catpaw_session::SessionError;
use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Route already exists: {0}")]
    RouteAlreadyExists(String),

    #[error("Invalid route path: {0}")]
    InvalidRoutePath(String),

    #[error("Parameter `{name}` is declared more than once in route {route}")]
    DuplicateParameter { route: String, name: String },

    #[error("Invalid query parameter: {0}")]
    InvalidQueryParameter(String),

    #[error("Dependency injection error: {0}")]
    DependencyInjection(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Unsupported Media Type: {0}")]
    UnsupportedMediaType(String),

    #[error("No Content-Type specified. Could not parse body.")]
    MissingContentType,

    #[error("Invalid byte range: {0}")]
    InvalidRange(String),

    #[error("Range Not Satisfiable: {0}")]
    RangeNotSatisfiable(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.http_status().as_u16()
    }

    /// Get the HTTP status for this error.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_)
            | Error::Deserialization(_)
            | Error::InvalidRange(_)
            | Error::MissingContentType => StatusCode::BAD_REQUEST,
            Error::RouteNotFound(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::RangeNotSatisfiable(_) => StatusCode::RANGE_NOT_SATISFIABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reason phrase for a status code, `"Unknown"` when unregistered.
pub fn reason_phrase(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::BadRequest("x".into()).status_code(), 400);
        assert_eq!(Error::MissingContentType.status_code(), 400);
        assert_eq!(Error::NotFound("x".into()).status_code(), 404);
        assert_eq!(Error::RangeNotSatisfiable("x".into()).status_code(), 416);
        assert_eq!(Error::Internal("x".into()).status_code(), 500);
        assert!(Error::ProviderNotFound("x".into()).is_server_error());
        assert!(Error::InvalidRange("x".into()).is_client_error());
    }

    #[test]
    fn test_reason_phrase() {
        assert_eq!(reason_phrase(404), "Not Found");
        assert_eq!(reason_phrase(500), "Internal Server Error");
        assert_eq!(reason_phrase(799), "Unknown");
    }
}
