//! Sentinel Server Library
//!
//! Core functionality for the Sentinel scan service:
//! - SQLite storage for identities, profiles, scan history and payments
//! - JWT authentication and password hashing
//! - Clients for the remote scan service and the payment gateway
//! - Token billing, subscriptions and history views
//! - The scan pipeline and per-user session contexts
//! - The axum HTTP API

pub mod auth;
pub mod billing;
pub mod clients;
pub mod context;
pub mod identity;
pub mod scanner;
pub mod server;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
