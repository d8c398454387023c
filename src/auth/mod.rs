//! Authentication
//!
//! Password hashing, bearer tokens and the login flow.

pub mod authenticator;
pub mod password;
pub mod token;

pub use authenticator::{Authenticator, Session};
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, IssuedToken, TokenError, TokenService};
