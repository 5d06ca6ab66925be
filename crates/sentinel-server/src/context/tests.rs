//! Context lifecycle tests.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use sentinel_core::ContentType;

use super::ContextRegistry;
use crate::billing::BillingError;
use crate::scanner::ScanError;
use crate::test_helpers::{
    offline_payment_client, signed_up, stub_scan_client, test_db, test_factory,
};

#[tokio::test]
async fn context_loads_profile_for_its_identity() {
    let db = test_db().await;
    let identity = signed_up(&db, "a@b.co").await;
    let factory = test_factory(&db, stub_scan_client().await, offline_payment_client());

    let mut ctx = factory.build(identity.clone());
    let profile = ctx.ensure_loaded().await.unwrap();
    assert_eq!(profile.id, identity.id);
    assert_eq!(profile.tokens_remaining, 2);

    let result = ctx.scan(ContentType::Text, "hello there").await.unwrap();
    assert_eq!(result.classification, "Suspicious");
    assert_eq!(ctx.store().tokens_remaining(), 1);
    assert_eq!(ctx.scanner().recent().len(), 1);
}

#[tokio::test]
async fn signing_out_drops_cached_state() {
    let db = test_db().await;
    let identity = signed_up(&db, "a@b.co").await;
    let factory = test_factory(&db, stub_scan_client().await, offline_payment_client());

    let mut ctx = factory.build(identity);
    ctx.scan(ContentType::Text, "hello").await.unwrap();
    assert!(ctx.scanner().latest().is_some());

    ctx.session().sign_out(None).await.unwrap();
    assert!(matches!(ctx.ensure_loaded().await, Err(BillingError::NotAuthenticated)));
    assert!(ctx.store().profile().is_none());
    assert!(ctx.scanner().latest().is_none());
    assert!(ctx.scanner().recent().is_empty());

    let err = ctx.scan(ContentType::Text, "again").await.unwrap_err();
    assert!(matches!(err, ScanError::NotAuthenticated));
}

#[tokio::test]
async fn identity_change_swaps_profile() {
    let db = test_db().await;
    let alice = signed_up(&db, "alice@b.co").await;
    let bob = signed_up(&db, "bob@b.co").await;
    let factory = test_factory(&db, stub_scan_client().await, offline_payment_client());

    let mut ctx = factory.build(alice.clone());
    ctx.scan(ContentType::Text, "alice's scan").await.unwrap();
    assert_eq!(ctx.ensure_loaded().await.unwrap().id, alice.id);

    ctx.session().sign_in("bob@b.co", "hunter22!").await.unwrap();
    let profile = ctx.ensure_loaded().await.unwrap();
    assert_eq!(profile.id, bob.id);
    assert_eq!(profile.tokens_remaining, 2);
    assert!(ctx.scanner().recent().is_empty());
}

#[tokio::test]
async fn registry_hands_out_one_context_per_user() {
    let db = test_db().await;
    let alice = signed_up(&db, "alice@b.co").await;
    let bob = signed_up(&db, "bob@b.co").await;
    let registry = ContextRegistry::new(test_factory(
        &db,
        stub_scan_client().await,
        offline_payment_client(),
    ));

    let a1 = registry.context_for(&alice).await;
    let a2 = registry.context_for(&alice).await;
    let b = registry.context_for(&bob).await;
    assert!(Arc::ptr_eq(&a1, &a2));
    assert!(!Arc::ptr_eq(&a1, &b));
    assert_eq!(registry.context_count().await, 2);

    assert!(registry.end_session(&alice.id).await);
    assert!(!registry.end_session(&alice.id).await);
    assert!(registry.get(&alice.id).await.is_none());
    assert!(a1.lock().await.session().identity().is_none());

    let fresh = registry.context_for(&alice).await;
    assert!(!Arc::ptr_eq(&a1, &fresh));
}

#[tokio::test]
async fn idle_contexts_are_evicted_unless_in_use() {
    let db = test_db().await;
    let alice = signed_up(&db, "alice@b.co").await;
    let bob = signed_up(&db, "bob@b.co").await;
    let registry = ContextRegistry::new(test_factory(
        &db,
        stub_scan_client().await,
        offline_payment_client(),
    ));

    let a1 = registry.context_for(&alice).await;
    let b = registry.context_for(&bob).await;
    assert_eq!(registry.evict_idle(Duration::from_secs(3600)).await, 0);
    assert_eq!(registry.context_count().await, 2);

    // Bob is mid-request, so only Alice goes.
    let guard = b.lock().await;
    assert_eq!(registry.evict_idle(Duration::ZERO).await, 1);
    assert!(registry.get(&alice.id).await.is_none());
    assert!(registry.get(&bob.id).await.is_some());
    drop(guard);

    assert_eq!(registry.evict_idle(Duration::ZERO).await, 1);
    assert_eq!(registry.context_count().await, 0);

    let fresh = registry.context_for(&alice).await;
    assert!(!Arc::ptr_eq(&a1, &fresh));
}
