//! Identity errors.

use thiserror::Error;

use sentinel_core::ErrorCode;
use sentinel_core::db::DatabaseError;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("User already registered")]
    EmailTaken,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Reset link is invalid or has expired")]
    InvalidResetToken,

    #[error("Could not send reset link: {0}")]
    Delivery(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Token creation failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl IdentityError {
    /// Whether the caller is unauthenticated, as opposed to sending bad input.
    pub const fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::NotSignedIn | Self::InvalidToken
        )
    }

    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidEmail | Self::WeakPassword(_) | Self::InvalidResetToken
        )
    }
}

impl ErrorCode for IdentityError {
    fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidEmail => Some("invalid_email"),
            Self::WeakPassword(_) => Some("weak_password"),
            Self::EmailTaken => Some("user_already_exists"),
            Self::InvalidCredentials => Some("invalid_credentials"),
            Self::NotSignedIn => Some("not_signed_in"),
            Self::InvalidToken | Self::InvalidResetToken => Some("invalid_token"),
            Self::Storage(e) => e.code(),
            Self::Delivery(_) | Self::Hash(_) | Self::Token(_) => None,
        }
    }
}
