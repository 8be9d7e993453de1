//! Error types for the docsight agent pipeline.
//!
//! Errors are structural, not textual: callers and the retry layer branch on
//! the variant, never on message contents. Per-task failures record an
//! [`ErrorKind`] so a finished [`crate::QueryResult`] can report why a task
//! failed without holding the original (non-`Clone`) error value.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the agent pipeline and its providers
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid credentials. Fatal to the whole query.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Provider rate limit (HTTP 429). Retried with backoff.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Transient provider failure: 5xx responses, connection resets.
    /// Retried with backoff.
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// Malformed request or unsupported input (4xx). Fails the current
    /// task; the agent continues with the rest of the plan.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The provider call exceeded the configured request timeout.
    #[error("Request timeout")]
    Timeout,

    /// Model output did not conform to the expected JSON schema. Every
    /// component has a documented fallback for this; it is never fatal.
    #[error("Unparseable model output: {0}")]
    Parse(String),

    /// An assigned document id could not be resolved by storage.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// The caller canceled the query.
    #[error("Query canceled")]
    Canceled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Copyable classification of an [`Error`], recorded on failed tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    RateLimited,
    Transient,
    BadRequest,
    Timeout,
    Parse,
    DocumentNotFound,
    Canceled,
    Config,
    InvalidInput,
    Http,
    Json,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Transient => "transient",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Parse => "parse",
            ErrorKind::DocumentNotFound => "document_not_found",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Config => "config",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Http => "http",
            ErrorKind::Json => "json",
        };
        write!(f, "{}", name)
    }
}

impl Error {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Error::Auth(msg.into())
    }

    /// Create a rate-limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Error::RateLimited(msg.into())
    }

    /// Create a transient provider error
    pub fn transient(msg: impl Into<String>) -> Self {
        Error::Transient(msg.into())
    }

    /// Create a bad-request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Error::BadRequest(msg.into())
    }

    /// Create a timeout error
    pub fn timeout() -> Self {
        Error::Timeout
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a document-not-found error
    pub fn not_found(doc_id: impl Into<String>) -> Self {
        Error::DocumentNotFound(doc_id.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an invalid-input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Classify this error into a copyable [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth(_) => ErrorKind::Auth,
            Error::RateLimited(_) => ErrorKind::RateLimited,
            Error::Transient(_) => ErrorKind::Transient,
            Error::BadRequest(_) => ErrorKind::BadRequest,
            Error::Timeout => ErrorKind::Timeout,
            Error::Parse(_) => ErrorKind::Parse,
            Error::DocumentNotFound(_) => ErrorKind::DocumentNotFound,
            Error::Canceled => ErrorKind::Canceled,
            Error::Config(_) => ErrorKind::Config,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Http(_) => ErrorKind::Http,
            Error::Json(_) => ErrorKind::Json,
        }
    }

    /// Whether this error is worth retrying with backoff.
    ///
    /// Rate limits, 5xx-class failures, timeouts, and transport errors are
    /// transient. Everything else (auth, bad requests, schema mismatches,
    /// missing documents, cancellation) will not improve on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited(_) => true,
            Error::Transient(_) => true,
            Error::Timeout => true,
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Whether this error must abort the entire query, not just one task.
    pub fn is_fatal_to_query(&self) -> bool {
        matches!(self, Error::Auth(_) | Error::Canceled)
    }
}
