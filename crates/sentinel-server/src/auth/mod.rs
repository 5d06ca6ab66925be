//! Authentication primitives for Sentinel.
//!
//! Provides JWT token management and password hashing.

pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::{Claims, TokenKind};
pub use jwt::JwtManager;
