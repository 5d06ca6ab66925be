//! Profiles, token balance, scan history, subscriptions and payments.

mod error;
pub mod export;
mod plans;
pub mod stats;
mod store;


pub use error::BillingError;
pub use export::ExportFormat;
pub use plans::{PlanResolver, fallback_plans};
pub use stats::{HistoryGroup, HistoryPage, HistoryStats};
pub use store::{
    PaymentOutcome, PaymentRequest, ProfileStore, ProfileUpdate, StoreSettings,
};
