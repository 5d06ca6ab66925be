//! Database connection and initialization.

pub use sentinel_core::db::DatabaseError;

sentinel_core::define_database!(SentinelDatabase, "Sentinel database migrations complete");
