//! Per-session identity state.
//!
//! A [`SessionHolder`] tracks which identity (if any) is current for one
//! session and broadcasts every change over a `watch` channel. Whatever owns
//! per-user state subscribes and drops that state when the identity goes
//! away or changes.

use tokio::sync::watch;

use super::error::IdentityError;
use super::provider::{Identity, IdentityProvider, Session};

pub struct SessionHolder {
    provider: IdentityProvider,
    current: watch::Sender<Option<Identity>>,
}

impl SessionHolder {
    /// A holder with nobody signed in.
    pub fn new(provider: IdentityProvider) -> Self {
        let (current, _) = watch::channel(None);
        Self { provider, current }
    }

    /// A holder already signed in as `identity`.
    pub fn with_identity(provider: IdentityProvider, identity: Identity) -> Self {
        let (current, _) = watch::channel(Some(identity));
        Self { provider, current }
    }

    /// Restore a session from an existing access token.
    pub async fn bootstrap(
        provider: IdentityProvider,
        access_token: &str,
    ) -> Result<Self, IdentityError> {
        let identity = provider.authenticate(access_token).await?;
        Ok(Self::with_identity(provider, identity))
    }

    pub fn identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    /// Receive every identity change for as long as this holder lives.
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Session, IdentityError> {
        let session = self.provider.sign_up(email, password, full_name).await?;
        self.set(Some(session.user.clone()));
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let session = self.provider.sign_in(email, password).await?;
        self.set(Some(session.user.clone()));
        Ok(session)
    }

    /// Revoke `refresh_token` (when given) and clear the identity.
    pub async fn sign_out(&self, refresh_token: Option<&str>) -> Result<(), IdentityError> {
        if let Some(token) = refresh_token {
            self.provider.sign_out(token).await?;
        }
        self.set(None);
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), IdentityError> {
        self.provider.reset_password(email).await
    }

    /// Requires a current identity.
    pub async fn update_password(&self, new_password: &str) -> Result<(), IdentityError> {
        let identity = self.identity().ok_or(IdentityError::NotSignedIn)?;
        self.provider.update_password(&identity.id, new_password).await
    }

    fn set(&self, identity: Option<Identity>) {
        self.current.send_if_modified(|current| {
            if *current == identity {
                false
            } else {
                *current = identity;
                true
            }
        });
    }
}
