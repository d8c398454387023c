//! Credential Authenticator
//!
//! Validates login/password pairs and resolves bearer tokens back to a
//! stored credential.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use super::password::verify_password;
use super::token::TokenService;
use crate::domain::{DomainError, OperationContext, UserCredential};
use crate::messages::Messages;
use crate::store::CredentialStore;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub login: String,
    pub token: String,
    pub expires_at: DateTime<FixedOffset>,
}

#[derive(Clone)]
pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    messages: Messages,
}

impl Authenticator {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        messages: Messages,
    ) -> Self {
        Self {
            credentials,
            tokens,
            messages,
        }
    }

    fn rejected(&self, ctx: &OperationContext, code: &'static str) -> DomainError {
        DomainError::auth_failed(code, self.messages.render(ctx.locale.as_deref(), code, &[]))
    }

    /// Check the pair against the credential store and issue a token
    pub async fn authenticate(
        &self,
        login: &str,
        password: &str,
        ctx: &OperationContext,
    ) -> Result<Session, DomainError> {
        let credential = self.credentials.find_by_login(login).await?;

        let credential = match credential {
            Some(credential) if verify_password(password, &credential.password_hash) => credential,
            _ => {
                tracing::warn!(
                    login = %login,
                    correlation_id = ?ctx.correlation_id,
                    "Login rejected"
                );
                return Err(self.rejected(ctx, "auth.invalid_credentials"));
            }
        };

        let issued = self
            .tokens
            .issue(credential.id, &credential.login)
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        tracing::info!(
            user_id = credential.id,
            correlation_id = ?ctx.correlation_id,
            "Login succeeded"
        );

        Ok(Session {
            user_id: credential.id,
            login: credential.login,
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Verify a bearer token and load the credential of its subject
    pub async fn resolve_bearer(
        &self,
        token: &str,
        ctx: &OperationContext,
    ) -> Result<UserCredential, DomainError> {
        let claims = self.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, correlation_id = ?ctx.correlation_id, "Bearer token rejected");
            self.rejected(ctx, "auth.invalid_token")
        })?;

        match self.credentials.find_by_login(&claims.sub).await? {
            Some(credential) => Ok(credential),
            None => {
                tracing::warn!(login = %claims.sub, "Token subject no longer exists");
                Err(self.rejected(ctx, "auth.invalid_token"))
            }
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::store::MemoryStore;

    fn setup() -> (Authenticator, Arc<TokenService>, MemoryStore) {
        let store = MemoryStore::new();
        store.add_user("admin", &hash_password("admin123").unwrap()).unwrap();
        let tokens = Arc::new(TokenService::new(b"test-secret-test-secret-test-sec"));
        let authenticator =
            Authenticator::new(Arc::new(store.clone()), tokens.clone(), Messages::bundled("en"));
        (authenticator, tokens, store)
    }

    #[tokio::test]
    async fn test_authenticate_issues_token_for_login() {
        let (auth, tokens, _) = setup();
        let ctx = OperationContext::new();

        let session = auth.authenticate("admin", "admin123", &ctx).await.unwrap();

        assert_eq!(session.login, "admin");
        assert_eq!(tokens.verify(&session.token).unwrap().sub, "admin");
    }

    #[tokio::test]
    async fn test_wrong_password_fails() {
        let (auth, _, _) = setup();
        let ctx = OperationContext::new().with_locale("pt-BR");

        let err = auth.authenticate("admin", "nope", &ctx).await.unwrap_err();

        assert_eq!(err.code(), "auth.invalid_credentials");
        assert_eq!(err.to_string(), "Login/Senha inválidos!");
    }

    #[tokio::test]
    async fn test_unknown_login_fails() {
        let (auth, _, _) = setup();

        let err = auth
            .authenticate("ghost", "admin123", &OperationContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::AuthFailed { .. }));
    }

    #[tokio::test]
    async fn test_resolve_bearer() {
        let (auth, tokens, _) = setup();
        let ctx = OperationContext::new();
        let session = auth.authenticate("admin", "admin123", &ctx).await.unwrap();

        let credential = auth.resolve_bearer(&session.token, &ctx).await.unwrap();
        assert_eq!(credential.login, "admin");

        let stranger = tokens.issue(99, "ghost").unwrap();
        let err = auth.resolve_bearer(&stranger.token, &ctx).await.unwrap_err();
        assert_eq!(err.code(), "auth.invalid_token");
    }
}
