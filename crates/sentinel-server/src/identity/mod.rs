//! Identity: sign-up, sign-in, token refresh, password reset, and the
//! per-session holder that broadcasts identity changes.

mod error;
mod holder;
mod provider;
mod reset;

#[cfg(test)]
mod tests;

pub use error::IdentityError;
pub use holder::SessionHolder;
pub use provider::{Identity, IdentityProvider, Session};
pub use reset::{LogResetSender, ResetLinkSender, reset_link};
