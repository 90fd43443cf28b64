//! Custom error types for translation operations

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// API request failed
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Retry after {retry_after:?} seconds")]
    RateLimitError {
        retry_after: Option<u64>,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        path: String,
        message: String,
    },

    /// Input path rejected before any translation starts
    #[error("Input error: {path} - {message}")]
    InputError {
        path: String,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// A chunk fell back to its original text while strict mode was on
    #[error("Chunk {index} could not be translated: {reason}")]
    ChunkFailed {
        index: usize,
        reason: String,
    },

    /// Invariant broken inside the crate, e.g. a blocking task that panicked
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Settings file or environment could not be read
    #[error("Settings error: {0}")]
    SettingsError(#[from] config::ConfigError),
}

impl TranslationError {
    /// Whether the transport layer should retry the request that produced this error.
    ///
    /// Rate limiting is deliberately excluded: it has its own wait-and-resend loop.
    pub fn is_transient(&self) -> bool {
        match self {
            TranslationError::NetworkError { .. } => true,
            TranslationError::ApiError { status, .. } => {
                matches!(status, 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        TranslationError::ConfigError {
            message: message.into(),
        }
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
