//! Per-user application state.
//!
//! An [`AppContext`] bundles one user's session, cached profile and scan
//! results. It follows its session: when the identity goes away or changes,
//! everything cached for the previous identity is dropped before the next
//! operation. The [`ContextRegistry`] hands out one context per user.

mod app;
mod registry;

#[cfg(test)]
mod tests;

pub use app::AppContext;
pub use registry::{ContextFactory, ContextRegistry, SharedContext};
