//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Every manager operation fails with exactly one of these kinds.
///
/// `code` is the message catalog key; `message` has already been rendered
/// in the caller's locale. The HTTP layer maps each kind to one status code.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Malformed id, malformed date, out-of-range value, unknown enum text,
    /// non-image upload
    #[error("{message}")]
    BadInput { code: &'static str, message: String },

    /// Referenced or target entity does not exist
    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    /// Bad credentials or a token that fails signature/expiry/issuer checks
    #[error("{message}")]
    AuthFailed { code: &'static str, message: String },

    /// Storage collaborator failure, already logged where it was wrapped
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn bad_input(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadInput {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn auth_failed(code: &'static str, message: impl Into<String>) -> Self {
        Self::AuthFailed {
            code,
            message: message.into(),
        }
    }

    /// Catalog key of the error, `storage_error` for wrapped storage failures
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadInput { code, .. }
            | Self::NotFound { code, .. }
            | Self::AuthFailed { code, .. } => code,
            Self::Storage(_) => "storage_error",
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_bad_input(&self) -> bool {
        matches!(self, Self::BadInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_and_message() {
        let err = DomainError::not_found("loan.not_found", "Loan 7 does not exist");

        assert_eq!(err.code(), "loan.not_found");
        assert_eq!(err.to_string(), "Loan 7 does not exist");
        assert!(err.is_not_found());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_storage_error_is_not_client_error() {
        let err = DomainError::Storage("connection reset".to_string());

        assert!(!err.is_client_error());
        assert_eq!(err.code(), "storage_error");
        assert!(err.to_string().contains("connection reset"));
    }
}
