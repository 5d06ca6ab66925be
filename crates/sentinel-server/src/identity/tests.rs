//! Identity provider and session holder tests.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use crate::test_helpers::{RecordingResetSender, test_db, test_provider};

use super::{IdentityError, SessionHolder};

#[tokio::test]
async fn sign_up_creates_identity_and_profile_with_two_tokens() {
    let db = test_db().await;
    let provider = test_provider(db.clone(), Arc::new(RecordingResetSender::default()));

    let session = provider
        .sign_up("  Alice@Example.COM ", "hunter22!", Some("Alice"))
        .await
        .unwrap();

    assert_eq!(session.user.email, "alice@example.com");
    assert_eq!(session.user.full_name.as_deref(), Some("Alice"));
    let profile = db.get_profile(&session.user.id).await.unwrap();
    assert_eq!(profile.tokens_remaining, 2);
    assert_eq!(profile.full_name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn sign_up_validates_email_and_password() {
    let provider = test_provider(test_db().await, Arc::new(RecordingResetSender::default()));

    let err = provider.sign_up("alice", "hunter22!", None).await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidEmail));

    let err = provider.sign_up("a@b.co", "short", None).await.unwrap_err();
    assert!(matches!(err, IdentityError::WeakPassword(8)));
}

#[tokio::test]
async fn duplicate_sign_up_is_rejected() {
    let provider = test_provider(test_db().await, Arc::new(RecordingResetSender::default()));
    provider.sign_up("a@b.co", "hunter22!", None).await.unwrap();
    let err = provider.sign_up("A@B.CO", "hunter22!", None).await.unwrap_err();
    assert!(matches!(err, IdentityError::EmailTaken));
}

#[tokio::test]
async fn sign_in_checks_password() {
    let provider = test_provider(test_db().await, Arc::new(RecordingResetSender::default()));
    provider.sign_up("a@b.co", "hunter22!", None).await.unwrap();

    let session = provider.sign_in("A@b.co", "hunter22!").await.unwrap();
    let identity = provider.authenticate(&session.access_token).await.unwrap();
    assert_eq!(identity.email, "a@b.co");

    let err = provider.sign_in("a@b.co", "wrong-pass").await.unwrap_err();
    assert!(err.is_auth());
    let err = provider.sign_in("nobody@b.co", "hunter22!").await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidCredentials));
}

#[tokio::test]
async fn refresh_rotates_token() {
    let provider = test_provider(test_db().await, Arc::new(RecordingResetSender::default()));
    let session = provider.sign_up("a@b.co", "hunter22!", None).await.unwrap();

    let rotated = provider.refresh(&session.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, session.refresh_token);

    let err = provider.refresh(&session.refresh_token).await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidToken));
}

#[tokio::test]
async fn access_token_cannot_refresh_and_refresh_token_cannot_authenticate() {
    let provider = test_provider(test_db().await, Arc::new(RecordingResetSender::default()));
    let session = provider.sign_up("a@b.co", "hunter22!", None).await.unwrap();

    assert!(provider.refresh(&session.access_token).await.is_err());
    assert!(provider.authenticate(&session.refresh_token).await.is_err());
}

#[tokio::test]
async fn sign_out_revokes_refresh_token() {
    let provider = test_provider(test_db().await, Arc::new(RecordingResetSender::default()));
    let session = provider.sign_up("a@b.co", "hunter22!", None).await.unwrap();

    assert!(provider.sign_out(&session.refresh_token).await.unwrap());
    assert!(!provider.sign_out(&session.refresh_token).await.unwrap());
    assert!(provider.refresh(&session.refresh_token).await.is_err());
}

#[tokio::test]
async fn reset_flow_sends_link_and_sets_new_password() {
    let sender = Arc::new(RecordingResetSender::default());
    let provider = test_provider(test_db().await, sender.clone());
    let session = provider.sign_up("a@b.co", "hunter22!", None).await.unwrap();

    provider.reset_password("a@b.co").await.unwrap();
    let (email, link) = sender.last().unwrap();
    assert_eq!(email, "a@b.co");
    assert!(link.starts_with("http://localhost:8080/reset-password?token="));
    let token = link.rsplit('=').next().unwrap();

    provider.complete_password_reset(token, "new-secret-1").await.unwrap();
    assert!(provider.sign_in("a@b.co", "new-secret-1").await.is_ok());
    assert!(provider.sign_in("a@b.co", "hunter22!").await.is_err());

    // Reset revokes outstanding refresh tokens and the link is single-use.
    assert!(provider.refresh(&session.refresh_token).await.is_err());
    let err = provider
        .complete_password_reset(token, "another-one-2")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidResetToken));
}

#[tokio::test]
async fn reset_for_unknown_email_sends_nothing() {
    let sender = Arc::new(RecordingResetSender::default());
    let provider = test_provider(test_db().await, sender.clone());
    provider.reset_password("ghost@b.co").await.unwrap();
    assert!(sender.last().is_none());
}

#[tokio::test]
async fn holder_broadcasts_identity_changes() {
    let provider = test_provider(test_db().await, Arc::new(RecordingResetSender::default()));
    let holder = SessionHolder::new(provider);
    let mut rx = holder.subscribe();
    assert!(holder.identity().is_none());

    let session = holder.sign_up("a@b.co", "hunter22!", None).await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().as_ref().unwrap().id, session.user.id);

    holder.sign_out(Some(&session.refresh_token)).await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_none());
}

#[tokio::test]
async fn holder_bootstraps_from_access_token() {
    let provider = test_provider(test_db().await, Arc::new(RecordingResetSender::default()));
    let session = provider.sign_up("a@b.co", "hunter22!", None).await.unwrap();

    let holder = SessionHolder::bootstrap(provider.clone(), &session.access_token)
        .await
        .unwrap();
    assert_eq!(holder.identity().unwrap().email, "a@b.co");

    assert!(SessionHolder::bootstrap(provider, "garbage").await.is_err());
}

#[tokio::test]
async fn update_password_requires_session() {
    let provider = test_provider(test_db().await, Arc::new(RecordingResetSender::default()));
    let holder = SessionHolder::new(provider);
    let err = holder.update_password("new-password").await.unwrap_err();
    assert!(matches!(err, IdentityError::NotSignedIn));

    holder.sign_up("a@b.co", "hunter22!", None).await.unwrap();
    holder.update_password("new-password").await.unwrap();
}

#[tokio::test]
async fn password_change_revokes_refresh_tokens() {
    let provider = test_provider(test_db().await, Arc::new(RecordingResetSender::default()));
    let session = provider.sign_up("a@b.co", "hunter22!", None).await.unwrap();
    let other = provider.sign_in("a@b.co", "hunter22!").await.unwrap();

    provider
        .update_password(&session.user.id, "new-secret-1")
        .await
        .unwrap();
    assert!(provider.refresh(&session.refresh_token).await.is_err());
    assert!(provider.refresh(&other.refresh_token).await.is_err());
    assert!(provider.sign_in("a@b.co", "new-secret-1").await.is_ok());
}
