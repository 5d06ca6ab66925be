//! `SQLite` storage for the Sentinel server.
//!
//! Provides persistence for identities, profiles, the plan catalog, scan
//! history, QR side-records, the subscription ledger and pending payments.
//! Every profile-owned query is scoped to the owning user id.

mod db;
mod models;
mod queries;
mod queries_billing;
mod queries_history;
mod queries_profiles;
mod queries_qr;
pub mod time;


pub use db::{DatabaseError, SentinelDatabase};
pub use models::*;
pub use queries_billing::{LedgerEntry, NewPayment};
pub use queries_history::HistoryFilters;
pub use queries_profiles::NewProfile;
pub use queries_qr::NewQrScan;
