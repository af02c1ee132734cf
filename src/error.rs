//! Error types for the phonebook server.
//!
//! This module defines custom error types using `thiserror` for precise error handling.

use crate::domain::{ContactId, ValidationError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors raised by a contact storage backend.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The targeted contact does not exist
    #[error("Contact {0} not found")]
    NotFound(ContactId),

    /// The SQL driver reported a failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Any other storage failure (corrupt row, clock error, ...)
    #[error("Storage error: {0}")]
    Storage(String),
}

/// The caller-facing classification of a failed operation.
///
/// Mapping a kind onto a wire status (HTTP code, MCP error code) is the
/// caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the contact service.
///
/// A closed set: every repository failure is classified into exactly one
/// of these variants before it leaves the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Malformed input, invalid phone, or no valid phones on create
    #[error("{0}")]
    Validation(String),

    /// The operation targeted a nonexistent contact
    #[error("{0}")]
    NotFound(String),

    /// Store or transport failure; the message is always opaque
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Build the opaque internal error.
    pub fn internal() -> Self {
        ServiceError::Internal("internal error".to_string())
    }

    /// The status-kind hint for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The caller-visible message.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::Validation(msg)
            | ServiceError::NotFound(msg)
            | ServiceError::Internal(msg) => msg,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has invalid value
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    /// Failed to load .env file
    #[error("Failed to load .env file: {0}")]
    DotenvError(String),
}

/// Convenience type alias for Results with RepositoryError
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for Results with ServiceError
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Convenience type alias for Results with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RepositoryError::NotFound(ContactId::new(9).unwrap());
        assert_eq!(err.to_string(), "Contact 9 not found");

        let err = ServiceError::Validation("no valid phones".to_string());
        assert_eq!(err.to_string(), "no valid phones");

        let err = ConfigError::InvalidValue {
            var: "MAX_PAGE_SIZE".to_string(),
            reason: "Must be at least 1".to_string(),
        };
        assert!(err.to_string().contains("MAX_PAGE_SIZE"));
    }

    #[test]
    fn test_service_error_kinds() {
        assert_eq!(
            ServiceError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(ServiceError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(ServiceError::internal().kind(), ErrorKind::Internal);
        assert_eq!(ServiceError::internal().message(), "internal error");
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: ServiceError = ValidationError::NoValidPhones.into();
        assert_eq!(err, ServiceError::Validation("no valid phones".to_string()));
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }
}
