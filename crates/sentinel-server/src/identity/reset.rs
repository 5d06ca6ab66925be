//! Delivery of password-reset links.

use tracing::info;

use super::error::IdentityError;

/// Sends a password-reset link to a user.
pub trait ResetLinkSender: Send + Sync {
    fn send_reset_link(&self, email: &str, link: &str) -> Result<(), IdentityError>;
}

/// Writes reset links to the log. Used when no mailer is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogResetSender;

impl ResetLinkSender for LogResetSender {
    fn send_reset_link(&self, email: &str, link: &str) -> Result<(), IdentityError> {
        info!(email, link, "Password reset link issued");
        Ok(())
    }
}

/// `{public_url}/reset-password?token={token}`.
pub fn reset_link(public_url: &str, token: &str) -> String {
    format!("{}/reset-password?token={token}", public_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_joins_without_double_slash() {
        assert_eq!(
            reset_link("https://app.example/", "abc"),
            "https://app.example/reset-password?token=abc"
        );
        assert_eq!(
            reset_link("http://localhost:8080", "t"),
            "http://localhost:8080/reset-password?token=t"
        );
    }
}
