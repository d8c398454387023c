//! Token Service
//!
//! Issues and verifies HS256 bearer tokens. The subject is the user login,
//! the user id travels in the `id` claim.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issuer claim written into and required from every token
pub const ISSUER: &str = "loan-tracker-api";

/// Token lifetime
pub const TOKEN_TTL_MINUTES: i64 = 30;

/// Expiry is computed in UTC-3
const EXPIRY_OFFSET_SECONDS: i32 = -3 * 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub id: i64,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<FixedOffset>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token could not be signed: {0}")]
    Signing(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token valid for [`TOKEN_TTL_MINUTES`] from now
    pub fn issue(&self, user_id: i64, login: &str) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, login, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        user_id: i64,
        login: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let offset = FixedOffset::east_opt(EXPIRY_OFFSET_SECONDS)
            .ok_or_else(|| TokenError::Signing("invalid expiry offset".to_string()))?;
        let expires_at = now.with_timezone(&offset) + Duration::minutes(TOKEN_TTL_MINUTES);

        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: login.to_string(),
            id: user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Check signature, issuer and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &ISSUER)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"0123456789abcdef0123456789abcdef")
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = service();
        let issued = tokens.issue(7, "admin").unwrap();

        let claims = tokens.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.id, 7);
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn test_expiry_is_thirty_minutes_in_utc_minus_three() {
        let tokens = service();
        let now = Utc::now();
        let issued = tokens.issue_at(1, "admin", now).unwrap();

        assert_eq!(issued.expires_at.offset().local_minus_utc(), -3 * 3600);
        assert_eq!(
            issued.expires_at.timestamp(),
            (now + Duration::minutes(30)).timestamp()
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let issued = tokens
            .issue_at(1, "admin", Utc::now() - Duration::minutes(31))
            .unwrap();

        assert!(matches!(tokens.verify(&issued.token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let tokens = service();
        let issued = tokens.issue(1, "admin").unwrap();

        let (payload, signature) = issued.token.rsplit_once('.').unwrap();
        let first = signature.chars().next().unwrap();
        let replacement = if first == 'A' { 'B' } else { 'A' };
        let tampered = format!("{payload}.{replacement}{}", &signature[1..]);

        assert!(matches!(tokens.verify(&tampered), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_other_secret_rejected() {
        let issued = service().issue(1, "admin").unwrap();
        let other = TokenService::new(b"another-secret-another-secret-xx");

        assert!(matches!(other.verify(&issued.token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let claims = Claims {
            iss: "someone-else".to_string(),
            sub: "admin".to_string(),
            id: 1,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::minutes(30)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(matches!(
            TokenService::new(secret).verify(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            service().verify("not-a-token"),
            Err(TokenError::Invalid(_))
        ));
    }
}
