//! Authentication primitives: password hashing and signed bearer tokens.
//!
//! - Passwords are stored as `pbkdf2:iterations:hex_salt:hex_hash`
//! - Access and refresh tokens are HS256 JWTs signed with separate secrets
//!   and tagged with their type, so one can never stand in for the other
//!
//! The HTTP middleware that turns a bearer token into an [`AuthUser`] lives
//! in `api::auth`.

mod password;
mod token;

pub use password::{hash_password, verify_password, DEFAULT_ITERATIONS};
pub use token::{Claims, TokenIssuer, TokenKind};

use thiserror::Error;

use crate::user::UserId;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Expected a {expected} token, got a {found} token")]
    WrongTokenType { expected: TokenKind, found: TokenKind },

    #[error("Token subject is not a user id")]
    InvalidSubject,

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// The caller identified by a verified access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
}
