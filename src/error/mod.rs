//! Token Store Error Types
//!
//! Error hierarchy for access token issuance, lookup and revocation.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the token store.
#[derive(Error, Debug)]
pub enum TokenStoreError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TokenStoreError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "TOKEN_STORE_CONFIG",
            Self::Validation(_) => "TOKEN_STORE_VALIDATION",
            Self::Generator(GeneratorError::TokenGeneratorNotFound { .. }) => {
                "TOKEN_STORE_GENERATOR_NOT_FOUND"
            }
            Self::Generator(GeneratorError::UnableToGenerateToken { .. }) => {
                "TOKEN_STORE_UNABLE_TO_GENERATE"
            }
            Self::Storage(_) => "TOKEN_STORE_STORAGE",
        }
    }

    /// Check if error is retryable by the caller.
    ///
    /// The store itself never retries these, apart from regenerating
    /// credentials after a unique violation.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if the error is a uniqueness failure on the given field.
    pub fn is_unique_violation(&self, field: &str) -> bool {
        match self {
            Self::Storage(StorageError::UniqueViolation { field: f }) => f == field,
            Self::Validation(ValidationError::NotUnique { field: f }) => f == field,
            _ => false,
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },
}

/// Validation failure detected before a token is committed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} can't be blank")]
    Missing { field: String },

    #[error("{field} is already taken")]
    NotUnique { field: String },

    #[error("{field} is out of range: {message}")]
    OutOfRange { field: String, message: String },
}

/// Token generation error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Token generator {name} not found")]
    TokenGeneratorNotFound { name: String },

    #[error("Unable to generate token with {generator}: {message}")]
    UnableToGenerateToken { generator: String, message: String },
}

/// Storage error reported by a repository.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Unique constraint violated on {field}")]
    UniqueViolation { field: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Storage operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Storage operation cancelled")]
    Cancelled,

    #[error("Access token {id} not found")]
    NotFound { id: i64 },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },
}

impl StorageError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. }
        )
    }
}

/// Result type for token store operations.
pub type TokenStoreResult<T> = Result<T, TokenStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(TokenStoreError::Storage(StorageError::Timeout {
            timeout: Duration::from_secs(5)
        })
        .is_retryable());
        assert!(!TokenStoreError::Storage(StorageError::Cancelled).is_retryable());
        assert!(!TokenStoreError::Validation(ValidationError::NotUnique {
            field: "token".to_string()
        })
        .is_retryable());
    }

    #[test]
    fn test_error_codes() {
        let err: TokenStoreError = GeneratorError::TokenGeneratorNotFound {
            name: "custom".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "TOKEN_STORE_GENERATOR_NOT_FOUND");

        let err: TokenStoreError = GeneratorError::UnableToGenerateToken {
            generator: "custom".to_string(),
            message: "blank".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "TOKEN_STORE_UNABLE_TO_GENERATE");
    }

    #[test]
    fn test_unique_violation_detection() {
        let err: TokenStoreError = StorageError::UniqueViolation {
            field: "refresh_token".to_string(),
        }
        .into();
        assert!(err.is_unique_violation("refresh_token"));
        assert!(!err.is_unique_violation("token"));
    }

    #[test]
    fn test_validation_messages() {
        let err = ValidationError::Missing {
            field: "token".to_string(),
        };
        assert_eq!(err.to_string(), "token can't be blank");

        let err = ValidationError::OutOfRange {
            field: "expires_in".to_string(),
            message: "must not be negative".to_string(),
        };
        assert_eq!(err.to_string(), "expires_in is out of range: must not be negative");
    }
}
