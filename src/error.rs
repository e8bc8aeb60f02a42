//! Error types for the Gemini AI client.

use std::fmt;

use thiserror::Error;

/// How a failed generation call should be treated by the caller.
///
/// The classification is decided once, where the HTTP response is read, so
/// nothing downstream has to search error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The API rejected the call because of rate limiting or exhausted quota.
    QuotaExceeded,
    /// The requested model does not exist or is not served for this key.
    NotFound,
    /// Any other failure, including transport errors.
    Other,
}

impl FailureKind {
    /// Classifies a non-success HTTP response.
    pub fn classify(status: u16, body: &str) -> Self {
        match status {
            429 => Self::QuotaExceeded,
            404 => Self::NotFound,
            _ if body.contains("RESOURCE_EXHAUSTED") || body.to_lowercase().contains("quota") => {
                Self::QuotaExceeded
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExceeded => write!(f, "quota exceeded"),
            Self::NotFound => write!(f, "not found"),
            Self::Other => write!(f, "unclassified"),
        }
    }
}

/// Errors that can occur when using the Gemini AI client.
#[derive(Debug, Error)]
pub enum GoogleGenerativeAIError {
    /// Base error for the Gemini AI client.
    #[error("[GoogleGenerativeAI Error]: {message}")]
    Base {
        /// Error message
        message: String,
    },

    /// The API answered with a non-success status.
    #[error("Request failed with status {status} ({kind}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Classification of the failure
        kind: FailureKind,
        /// Response body returned by the API
        message: String,
    },

    /// Error occurred during an API request.
    #[error("API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error occurred when accessing environment variables.
    #[error("Environment variable not found: {0}")]
    EnvError(#[from] std::env::VarError),

    /// Error occurred when parsing JSON.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl GoogleGenerativeAIError {
    /// Creates a new Base error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Base {
            message: message.into(),
        }
    }

    /// Creates an API error from a failed HTTP response, classifying it.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        Self::Api {
            status,
            kind: FailureKind::classify(status, &message),
            message,
        }
    }

    /// Returns how the caller should treat this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Api { kind, .. } => *kind,
            _ => FailureKind::Other,
        }
    }
}
