//! Error types for the request controller.

/// A specialized Result type for fetchwire operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Errors raised while resolving, encoding, or executing a request.
///
/// The controller never returns these to the caller directly: runtime
/// failures are handed to the error mapper and end up in the `error` state
/// cell. The variants exist so mappers (and construction) can distinguish
/// failure classes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request error: {0}")]
    Request(String),

    /// Invalid URL provided.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Connection refused or failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Invalid header name or value.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// I/O error (e.g. reading a file part for a multipart body).
    #[error("I/O error: {0}")]
    Io(String),

    /// Descriptor resolution failed.
    #[error("descriptor error: {0}")]
    Descriptor(String),

    /// Controller was misconfigured at build time.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Json(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
