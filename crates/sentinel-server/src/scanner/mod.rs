//! The scan pipeline.
//!
//! Input is validated locally, the user's balance is checked, the remote
//! scan service produces a verdict, and the verdict is recorded in history
//! with its tokens deducted. QR payloads are routed to a wallet, URL or text
//! scan first.

mod error;
mod orchestrator;
pub mod qr;
pub mod validate;


pub use error::ScanError;
pub use orchestrator::{DEFAULT_QR_SOURCE, ScanResult, Scanner};
