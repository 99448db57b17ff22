/*!
 * Error types for the subtrad library.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions.
 *
 * Propagation policy: provider errors are recovered inside the adapters and the
 * translation service (falling back to the source text). Only input errors and
 * cardinality errors that survive to finalization reach the caller. The
 * controller reports its own failures as `AppError`.
 */

use thiserror::Error;

/// Errors that can occur when talking to a translation backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when sending a request fails
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing a response body fails
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Error status returned by the backend itself
    #[error("Backend responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the backend
        message: String,
    },

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The response was well-formed but unusable (empty, wrong shape, wrong count)
    #[error("Unusable response: {0}")]
    BadResponse(String),

    /// The run was cancelled before the call completed
    #[error("Cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::Timeout(_)
            | Self::RateLimitExceeded(_)
            | Self::BadResponse(_)
            | Self::ParseError(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::Cancelled => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(0)
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while reading or writing subtitle files
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// The file could not be read
    #[error("Failed to read subtitle file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file declared an encoding through its BOM but did not decode cleanly
    #[error("Failed to decode {path} as {encoding}")]
    Encoding { path: String, encoding: String },

    /// The file decoded, but no subtitle block could be parsed from it
    #[error("No subtitle entries found in {0}")]
    Empty(String),

    /// The file could not be written
    #[error("Failed to write subtitle file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can terminate a translation run
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error with subtitle input or output
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// The number of results does not match the number of inputs
    #[error("Cardinality mismatch: expected {expected} results, got {actual}")]
    CardinalityMismatch {
        /// Number of inputs
        expected: usize,
        /// Number of results produced
        actual: usize,
    },

    /// Invalid input handed to the pipeline
    #[error("Invalid input: {0}")]
    Input(String),
}

/// Errors surfaced by the application controller
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing input or a directory that could not be scanned
    #[error("File error: {0}")]
    File(String),

    /// The configured backend could not be reached or answered unusably
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Configuration problem
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_with_server_errors_should_retry() {
        let err = ProviderError::ApiError { status_code: 503, message: "busy".into() };
        assert!(err.is_retryable());
        let err = ProviderError::ApiError { status_code: 429, message: "slow down".into() };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_is_retryable_with_client_error_or_cancel_should_not_retry() {
        let err = ProviderError::ApiError { status_code: 400, message: "bad".into() };
        assert!(!err.is_retryable());
        assert!(!ProviderError::Cancelled.is_retryable());
    }

    #[test]
    fn test_cardinality_error_display_should_mention_counts() {
        let err = TranslationError::CardinalityMismatch { expected: 3, actual: 2 };
        assert_eq!(err.to_string(), "Cardinality mismatch: expected 3 results, got 2");
    }

    #[test]
    fn test_app_error_wraps_provider_and_subtitle_errors() {
        let err: AppError = ProviderError::Timeout(5).into();
        assert!(matches!(err, AppError::Provider(ProviderError::Timeout(5))));
        assert_eq!(err.to_string(), "Provider error: Request timed out after 5 seconds");

        let err: AppError = SubtitleError::Empty("a.srt".to_string()).into();
        assert_eq!(err.to_string(), "Subtitle error: No subtitle entries found in a.srt");
    }
}
