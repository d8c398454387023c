//! Stored credentials
//!
//! Used only by authentication; not part of the loan domain.

use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct UserCredential {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
}

impl fmt::Debug for UserCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredential")
            .field("id", &self.id)
            .field("login", &self.login)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}
