//! Harness error types

use std::time::Duration;

use thiserror::Error;

use crate::runtime::ApiError;

/// Result type for suite and runner operations
pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("HTTP call failed: {0}")]
    Api(#[from] ApiError),

    #[error("Assertion failed: {message}")]
    Assertion { message: String },

    #[error("Services not ready: {}", services.join(", "))]
    NotReady { services: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(#[from] shared::SharedError),

    #[error("{what} did not complete within {after:?}")]
    Timeout { what: String, after: Duration },

    #[error("Unknown suite: '{name}'. Available: {available}")]
    UnknownSuite { name: String, available: String },

    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),

    /// The case cannot run against this deployment
    #[error("Skipped: {reason}")]
    Skipped { reason: String },
}

impl HarnessError {
    pub fn assertion(message: impl Into<String>) -> Self {
        HarnessError::Assertion {
            message: message.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        HarnessError::Skipped {
            reason: reason.into(),
        }
    }

    /// Upstream HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            HarnessError::Api(api) => api.status(),
            _ => None,
        }
    }
}
