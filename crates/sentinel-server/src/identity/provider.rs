//! Local identity provider: users, sessions and password operations.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use sentinel_core::db::unix_timestamp;

use super::error::IdentityError;
use super::reset::{ResetLinkSender, reset_link};
use crate::auth::JwtManager;
use crate::auth::password;
use crate::storage::{NewProfile, SentinelDatabase, User};

/// The signed-in user as seen by the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
        }
    }
}

/// Tokens handed to a client after sign-in, sign-up or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: Identity,
}

#[derive(Clone)]
pub struct IdentityProvider {
    db: SentinelDatabase,
    jwt: Arc<JwtManager>,
    reset_sender: Arc<dyn ResetLinkSender>,
    public_url: String,
    reset_ttl_secs: i64,
    signup_tokens: i64,
}

impl IdentityProvider {
    pub fn new(
        db: SentinelDatabase,
        jwt: Arc<JwtManager>,
        reset_sender: Arc<dyn ResetLinkSender>,
        public_url: impl Into<String>,
        reset_ttl_secs: i64,
        signup_tokens: i64,
    ) -> Self {
        Self {
            db,
            jwt,
            reset_sender,
            public_url: public_url.into(),
            reset_ttl_secs,
            signup_tokens,
        }
    }

    /// Register a new identity and eagerly create its profile.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Session, IdentityError> {
        let email = normalize_email(email)?;
        if !password::is_strong_enough(password) {
            return Err(IdentityError::WeakPassword(password::MIN_PASSWORD_LEN));
        }

        let hash =
            password::hash_password(password).map_err(|e| IdentityError::Hash(e.to_string()))?;
        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());

        let user_id = uuid::Uuid::new_v4().to_string();
        let user = match self.db.create_user(&user_id, &email, &hash, full_name).await {
            Ok(user) => user,
            Err(e) if e.is_conflict() => return Err(IdentityError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        let created = self
            .db
            .create_profile(&NewProfile {
                id: &user.id,
                email: &user.email,
                full_name: user.full_name.as_deref(),
                avatar_url: user.avatar_url.as_deref(),
                tokens_remaining: self.signup_tokens,
            })
            .await;
        match created {
            Ok(_) => {}
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, "User registered");
        self.issue_session(user.into()).await
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let email = email.trim().to_lowercase();
        let user = match self.db.get_user_by_email(&email).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Err(IdentityError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };

        let valid = password::verify_password(password, &user.password_hash)
            .map_err(|e| IdentityError::Hash(e.to_string()))?;
        if !valid {
            warn!(user_id = %user.id, "Failed sign-in attempt");
            return Err(IdentityError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User signed in");
        self.issue_session(user.into()).await
    }

    /// Revoke a refresh token. Unknown tokens are not an error.
    pub async fn sign_out(&self, refresh_token: &str) -> Result<bool, IdentityError> {
        let hash = JwtManager::hash_token(refresh_token);
        match self.db.get_refresh_token_by_hash(&hash).await? {
            Some(token) => Ok(self.db.revoke_refresh_token(&token.id).await?),
            None => Ok(false),
        }
    }

    /// Exchange a refresh token for a new session, revoking the old token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let claims = self
            .jwt
            .validate(refresh_token)
            .map_err(|_| IdentityError::InvalidToken)?;
        if !claims.is_refresh() {
            return Err(IdentityError::InvalidToken);
        }

        let hash = JwtManager::hash_token(refresh_token);
        let stored = self
            .db
            .get_refresh_token_by_hash(&hash)
            .await?
            .ok_or(IdentityError::InvalidToken)?;
        self.db.revoke_refresh_token(&stored.id).await?;

        let user = self.load_user(&claims.sub).await?;
        self.issue_session(user.into()).await
    }

    /// Resolve an access token to its identity.
    pub async fn authenticate(&self, access_token: &str) -> Result<Identity, IdentityError> {
        let claims = self
            .jwt
            .validate(access_token)
            .map_err(|_| IdentityError::InvalidToken)?;
        if !claims.is_access() {
            return Err(IdentityError::InvalidToken);
        }
        Ok(self.load_user(&claims.sub).await?.into())
    }

    /// Issue a single-use reset token and send the link. Unknown addresses
    /// succeed silently so account existence is not disclosed.
    #[instrument(skip(self))]
    pub async fn reset_password(&self, email: &str) -> Result<(), IdentityError> {
        let email = email.trim().to_lowercase();
        let user = match self.db.get_user_by_email(&email).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let token = uuid::Uuid::new_v4().simple().to_string();
        self.db
            .create_password_reset(
                &uuid::Uuid::new_v4().to_string(),
                &user.id,
                &JwtManager::hash_token(&token),
                unix_timestamp() + self.reset_ttl_secs,
            )
            .await?;

        self.reset_sender
            .send_reset_link(&user.email, &reset_link(&self.public_url, &token))
    }

    /// Set a new password using a reset token. Revokes all refresh tokens.
    pub async fn complete_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        if !password::is_strong_enough(new_password) {
            return Err(IdentityError::WeakPassword(password::MIN_PASSWORD_LEN));
        }
        let reset = self
            .db
            .consume_password_reset(&JwtManager::hash_token(token))
            .await?
            .ok_or(IdentityError::InvalidResetToken)?;

        self.set_password(&reset.user_id, new_password).await?;
        self.db.revoke_user_refresh_tokens(&reset.user_id).await?;
        info!(user_id = %reset.user_id, "Password reset completed");
        Ok(())
    }

    /// Change the password of a signed-in user. Revokes all refresh tokens.
    pub async fn update_password(
        &self,
        user_id: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        if !password::is_strong_enough(new_password) {
            return Err(IdentityError::WeakPassword(password::MIN_PASSWORD_LEN));
        }
        self.set_password(user_id, new_password).await?;
        self.db.revoke_user_refresh_tokens(user_id).await?;
        info!(user_id, "Password changed");
        Ok(())
    }

    async fn set_password(&self, user_id: &str, new_password: &str) -> Result<(), IdentityError> {
        let hash = password::hash_password(new_password)
            .map_err(|e| IdentityError::Hash(e.to_string()))?;
        self.db.update_password_hash(user_id, &hash).await?;
        Ok(())
    }

    async fn load_user(&self, user_id: &str) -> Result<User, IdentityError> {
        match self.db.get_user(user_id).await {
            Ok(user) => Ok(user),
            Err(e) if e.is_not_found() => Err(IdentityError::InvalidToken),
            Err(e) => Err(e.into()),
        }
    }

    async fn issue_session(&self, user: Identity) -> Result<Session, IdentityError> {
        let (access_token, expires_in) = self.jwt.issue_access_token(&user.id, &user.email)?;
        let (refresh_token, refresh_exp) = self.jwt.issue_refresh_token(&user.id, &user.email)?;

        self.db
            .create_refresh_token(
                &uuid::Uuid::new_v4().to_string(),
                &user.id,
                &JwtManager::hash_token(&refresh_token),
                refresh_exp,
            )
            .await?;

        Ok(Session {
            access_token,
            refresh_token,
            expires_in,
            user,
        })
    }
}

fn normalize_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(IdentityError::InvalidEmail);
    }
    Ok(email)
}
