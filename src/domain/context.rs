//! Operation Context
//!
//! Contains metadata about the current operation for message rendering and tracing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for an operation, passed to every manager call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationContext {
    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,

    /// Id of the authenticated user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    /// Login of the authenticated user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_login: Option<String>,

    /// Caller's locale tag, e.g. `pt-BR`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl OperationContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create context with correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Create context with the authenticated user
    pub fn with_user(mut self, user_id: i64, login: impl Into<String>) -> Self {
        self.user_id = Some(user_id);
        self.user_login = Some(login.into());
        self
    }

    /// Create context with the caller's locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let correlation_id = Uuid::new_v4();

        let context = OperationContext::new()
            .with_user(3, "admin")
            .with_locale("en")
            .with_correlation_id(correlation_id);

        assert_eq!(context.user_id, Some(3));
        assert_eq!(context.user_login.as_deref(), Some("admin"));
        assert_eq!(context.locale.as_deref(), Some("en"));
        assert_eq!(context.correlation_id, Some(correlation_id));
    }

    #[test]
    fn test_ensure_correlation_id() {
        let mut context = OperationContext::new();
        assert!(context.correlation_id.is_none());

        let id = context.ensure_correlation_id();
        assert_eq!(context.correlation_id, Some(id));

        // Calling again should return the same ID
        let id2 = context.ensure_correlation_id();
        assert_eq!(id, id2);
    }
}
