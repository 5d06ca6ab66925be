//! Sentinel Core Library
//!
//! Shared functionality for Sentinel components:
//! - Failure normalization into user-facing messages and machine codes
//! - Scan domain types (content types, token costs, risk banding)
//! - Configuration resolution and hierarchy
//! - SQLite pool helpers shared by the storage layer
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod failure;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod scan;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use failure::{ErrorCode, Failure, code_of, message_of};
pub use scan::{ContentType, RiskBand, SubscriptionStatus, parse_risk_score};
