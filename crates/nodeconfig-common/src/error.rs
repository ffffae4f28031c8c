//! Error types for NodeConfig operations
//!
//! Validation failures are normally returned as data (see
//! [`ValidationResult`](crate::ValidationResult)); this error type exists for
//! callers that want `Result` plumbing and for manifest decoding failures.

use thiserror::Error;

use crate::validation::Violation;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for NodeConfig operations
#[derive(Debug, Error)]
pub enum Error {
    /// The spec failed one or more validation rules
    #[error("validation failed with {} violation(s): {}", violations.len(), summarize(violations))]
    Validation {
        /// Every violation found, in rule order
        violations: Vec<Violation>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being decoded (if known)
        kind: Option<String>,
    },

    /// YAML syntax error
    #[error("yaml error: {message}")]
    Yaml {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a validation error from a violation set
    pub fn validation(violations: Vec<Violation>) -> Self {
        Self::Validation { violations }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a YAML error with the given message
    pub fn yaml(msg: impl Into<String>) -> Self {
        Self::Yaml {
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Validation, serialization and YAML errors require an input fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::Yaml { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Violations carried by a validation error, empty for every other kind
    pub fn violations(&self) -> &[Violation] {
        match self {
            Error::Validation { violations } => violations,
            _ => &[],
        }
    }
}

impl From<crate::yaml::YamlError> for Error {
    fn from(err: crate::yaml::YamlError) -> Self {
        Self::yaml(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
