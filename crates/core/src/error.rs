//! Domain error model.
//!
//! Every failure surfaced past an operation-module boundary is a
//! [`DomainError`]: a message, a classified [`ErrorCode`], and (when a
//! backend failure was translated) the original error as source. Raw backend
//! error shapes never cross that boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Closed classification of domain failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Duplicate,
    Validation,
    ForeignKey,
    Permission,
    Transaction,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::Duplicate => "duplicate",
            ErrorCode::Validation => "validation",
            ErrorCode::ForeignKey => "foreign_key",
            ErrorCode::Permission => "permission",
            ErrorCode::Transaction => "transaction",
            ErrorCode::Unknown => "unknown",
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level error.
///
/// Keep messages caller-facing: they are what API clients and logs see.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DomainError {
    message: String,
    code: ErrorCode,
    #[source]
    source: Option<BoxedCause>,
}

impl DomainError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Wrap a lower-level error, keeping it reachable through
    /// `std::error::Error::source` for logs.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl Into<BoxedCause>,
    ) -> Self {
        Self {
            message: message.into(),
            code,
            source: Some(source.into()),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn not_found(resource: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("{} not found", resource.as_ref()),
        )
    }

    pub fn duplicate(resource: impl AsRef<str>, msg: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::Duplicate,
            format!("{}: {}", resource.as_ref(), msg.as_ref()),
        )
    }

    pub fn validation(resource: impl AsRef<str>, msg: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::Validation,
            format!("{}: {}", resource.as_ref(), msg.as_ref()),
        )
    }

    pub fn foreign_key(resource: impl AsRef<str>, msg: impl AsRef<str>) -> Self {
        Self::new(
            ErrorCode::ForeignKey,
            format!("{}: {}", resource.as_ref(), msg.as_ref()),
        )
    }

    /// Permission errors carry their message verbatim; several of them are
    /// user-facing contract strings ("Only team admins can remove members.").
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Permission, msg)
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transaction, msg)
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_resource_name() {
        let err = DomainError::not_found("Transcript");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "Transcript not found");
    }

    #[test]
    fn with_source_keeps_cause_reachable() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = DomainError::with_source(ErrorCode::Unknown, "backend failure", io);
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn codes_serialize_snake_case() {
        let json = serde_json::to_string(&ErrorCode::ForeignKey).unwrap();
        assert_eq!(json, "\"foreign_key\"");
    }
}
