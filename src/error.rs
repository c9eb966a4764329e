//! Error types for spot-optimizer
//!
//! This module defines the error handling strategy for spot-optimizer. There are two
//! error types: `OptimizerError` (main error enum) and `ConfigError` (configuration-specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `OptimizerError`.
//! CLI code uses `anyhow::Result<T>` for top-level error handling. The conversion
//! happens at the CLI boundary using `anyhow::Error::from` to preserve error chains.
//!
//! Request-level failures (`InvalidRequest`, `NoCandidate`) never escape
//! `SpotOptimizer::optimize` as `Err`: they are turned into an `ErrorResult`
//! and returned as data. `RateFetch` is absorbed by the interruption-rate cache.
//! `CatalogLoad` is only produced while building the catalog at startup.
//!
//! ## Retry Awareness
//!
//! Errors implement `IsRetryable` to indicate whether an operation should be retried.
//! The `RetryPolicy` in `src/retry.rs` uses this to determine retry behavior.
//! Only `RateFetch`, `Io`, and `Retryable` variants are retryable.

use thiserror::Error;

/// Main error type for spot-optimizer
#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid request: {field} - {reason}")]
    InvalidRequest { field: String, reason: String },

    #[error("{message}")]
    NoCandidate { message: String },

    #[error("Interruption rate fetch failed ({source_url}): {message}")]
    RateFetch {
        source_url: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to load instance catalog from {path}: {reason}")]
    CatalogLoad { path: String, reason: String },

    #[error("Retryable error (attempt {attempt}/{max_attempts}): {reason}")]
    Retryable {
        attempt: u32,
        max_attempts: u32,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, OptimizerError>;

impl OptimizerError {
    /// Shorthand for an `InvalidRequest` error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        OptimizerError::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a `RateFetch` error without an underlying source
    pub fn rate_fetch(source_url: impl Into<String>, message: impl Into<String>) -> Self {
        OptimizerError::RateFetch {
            source_url: source_url.into(),
            message: message.into(),
            source: None,
        }
    }
}

/// Trait for determining if an error is retryable
///
/// Used by `RetryPolicy` implementations to determine whether an error
/// should trigger a retry attempt.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for OptimizerError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            OptimizerError::Retryable { .. }
                | OptimizerError::RateFetch { .. }
                | OptimizerError::Io(_)
        )
    }
}
