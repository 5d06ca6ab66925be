//! Outbound HTTP clients for the remote scan service and the payment gateway.
//!
//! Both use reqwest with rustls. Upstream responses are normalized at the
//! deserialization boundary (see [`types`]).

mod payment;
mod scan;
pub mod types;

#[cfg(test)]
mod tests;

pub use payment::{PaymentClient, PaymentError};
pub use scan::{ScanApiError, ScanClient};
pub use types::{InitPayment, PaymentAuthorization, ScanVerdict};

/// Ensure a base URL ends with exactly one `/` so relative paths join under it.
pub(crate) fn with_trailing_slash(base: &str) -> String {
    format!("{}/", base.trim_end_matches('/'))
}

/// Install the ring crypto provider for rustls (reqwest is built with
/// `rustls-no-provider`). Already-installed is not an error.
pub(crate) fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
