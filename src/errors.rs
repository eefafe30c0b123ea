//! Error types for the mnemo memory engine
//!
//! Every failure is scoped to a single call; nothing here is
//! process-fatal. Provider outages degrade or surface per operation.

use thiserror::Error;

/// Main error type for memory engine operations
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Empty or missing required field
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Unknown user or session (non-fatal on lifecycle paths)
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Embedding provider, vector index, or durable store unavailable
    #[error("Provider '{provider}' failed: {reason}")]
    Provider { provider: String, reason: String },

    /// Duplicate active session id
    #[error("Session {0} already exists and is active")]
    Conflict(String),

    /// Provider call exceeded its bounded timeout
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors (config load/save)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MemoryError {
    /// Validation error for a named field
    pub fn validation(field: &str, reason: &str) -> Self {
        MemoryError::Validation {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Provider failure with a named source
    pub fn provider(provider: &str, reason: impl ToString) -> Self {
        MemoryError::Provider {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Missing session/user/entry
    pub fn not_found(kind: &str, id: &str) -> Self {
        MemoryError::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}

/// Result type alias for memory engine operations
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Convert anyhow errors from provider internals
impl From<anyhow::Error> for MemoryError {
    fn from(err: anyhow::Error) -> Self {
        MemoryError::Provider {
            provider: "internal".to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MemoryError::Conflict("sess-1".to_string());
        assert!(err.to_string().contains("sess-1"));
        assert!(err.to_string().contains("active"));
    }

    #[test]
    fn test_validation_error() {
        let err = MemoryError::validation("user_id", "must not be empty");
        assert!(err.to_string().contains("user_id"));
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_provider_error() {
        let err = MemoryError::provider("embedding", "connection refused");
        assert!(err.to_string().contains("embedding"));
        assert!(err.to_string().contains("connection refused"));
    }
}
