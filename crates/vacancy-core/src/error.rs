use thiserror::Error;

/// Application-wide error types for the vacancy pipeline.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed input, failed validation, or a decision that cannot be applied.
    #[error("{0}")]
    BadRequest(String),

    /// Signed approval token could not be decoded or verified.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// HTTP request failed (fetching a page or calling a webhook).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// LLM API call failed.
    #[error("LLM error (HTTP {status_code}): {message}")]
    LlmError {
        message: String,
        status_code: u16,
    },

    /// HTML-to-Markdown conversion failed.
    #[error("Cleaner error: {0}")]
    CleanerError(String),

    /// Extracted JSON does not match the expected schema.
    #[error("Schema validation error: {0}")]
    SchemaValidationError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Message transport failed to publish, receive, or settle.
    #[error("Queue error: {0}")]
    QueueError(String),

    /// Headless browser could not render or capture a page.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true for errors caused by the caller rather than by a collaborator.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, AppError::BadRequest(_) | AppError::InvalidToken(_))
    }

    /// Machine-readable error code surfaced to HTTP clients.
    pub fn err_code(&self) -> &'static str {
        if self.is_bad_request() {
            "ERR_BAD_REQUEST"
        } else {
            "ERR_INTERNAL_ERROR"
        }
    }
}
