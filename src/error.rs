//! Error types for MediaSet.
//!
//! All errors in MediaSet are strongly typed using thiserror.
//! This enables pattern matching on specific error conditions
//! and provides clear error messages.

use thiserror::Error;

/// Errors raised while compiling a breakpoint descriptor into a media query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaQueryError {
    #[error("argument is not an object or string (got {found})")]
    InvalidInput {
        found: String,
    },

    #[error("Invalid media type: {media_type}")]
    InvalidMediaType {
        media_type: String,
    },

    #[error("feature {feature} does not accept a range")]
    RangeNotAllowed {
        feature: String,
    },

    #[error("feature {feature} range must have exactly 2 bounds, got {len}")]
    InvalidRangeArity {
        feature: String,
        len: usize,
    },

    #[error("Unrecognized media query keys: {}", .keys.join(", "))]
    UnrecognizedKeys {
        keys: Vec<String>,
    },

    #[error("feature {feature} invalid value {value}")]
    InvalidValue {
        feature: String,
        value: String,
    },
}

/// Errors in observer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("fallback set must be of type set of breakpoint names: {reason}")]
    InvalidFallback {
        reason: String,
    },

    #[error("Invalid breakpoint configuration: {reason}")]
    InvalidConfiguration {
        reason: String,
    },

    #[error("Failed to read configuration from {path}: {message}")]
    Io {
        path: String,
        message: String,
    },
}

/// Errors for lifecycle transitions that are no longer valid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Observer is torn down; cannot {operation}")]
    TornDown {
        operation: &'static str,
    },
}

/// Top-level error type for MediaSet.
#[derive(Debug, Error)]
pub enum MediaSetError {
    #[error("Media query error: {0}")]
    MediaQuery(#[from] MediaQueryError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

impl MediaSetError {
    /// Returns true if this is a media query error.
    #[must_use]
    pub const fn is_media_query(&self) -> bool {
        matches!(self, Self::MediaQuery(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this is a lifecycle error.
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Lifecycle(_))
    }
}

/// Result type alias for MediaSet operations.
pub type MediaSetResult<T> = Result<T, MediaSetError>;
