//! Shared test helpers for identity, billing, scanner and route tests.
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use sentinel_core::config::{PaymentsConfig, ScanApiConfig};

use crate::auth::JwtManager;
use crate::identity::{Identity, IdentityError, IdentityProvider, ResetLinkSender};
use crate::storage::SentinelDatabase;

pub const TEST_API_KEY: &str = "test-key";

/// Fresh in-memory database with migrations applied.
pub async fn test_db() -> SentinelDatabase {
    SentinelDatabase::open_in_memory().await.unwrap()
}

/// Captures reset links instead of delivering them.
#[derive(Default)]
pub struct RecordingResetSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingResetSender {
    pub fn last(&self) -> Option<(String, String)> {
        self.sent.lock().unwrap().last().cloned()
    }
}

impl ResetLinkSender for RecordingResetSender {
    fn send_reset_link(&self, email: &str, link: &str) -> Result<(), IdentityError> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), link.to_string()));
        Ok(())
    }
}

pub fn test_jwt() -> Arc<JwtManager> {
    Arc::new(JwtManager::new(b"test-secret", 3600, 86_400))
}

pub fn test_provider(db: SentinelDatabase, sender: Arc<dyn ResetLinkSender>) -> IdentityProvider {
    IdentityProvider::new(db, test_jwt(), sender, "http://localhost:8080", 3600, 2)
}

/// Register a user through the provider so that user and profile rows exist.
pub async fn signed_up(db: &SentinelDatabase, email: &str) -> Identity {
    test_provider(db.clone(), Arc::new(RecordingResetSender::default()))
        .sign_up(email, "hunter22!", Some("Test User"))
        .await
        .unwrap()
        .user
}

/// Serve `router` on an ephemeral local port. Returns the base URL with a
/// trailing slash.
pub async fn spawn_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/")
}

pub fn scan_config(base_url: &str) -> ScanApiConfig {
    ScanApiConfig {
        base_url: base_url.to_string(),
        api_key: TEST_API_KEY.to_string(),
    }
}

pub fn payments_config(base_url: &str) -> PaymentsConfig {
    PaymentsConfig {
        base_url: base_url.to_string(),
        ..PaymentsConfig::default()
    }
}

/// Scan service stub answering every kind with a fixed verdict.
pub async fn stub_scan_client() -> crate::clients::ScanClient {
    use axum::routing::post;

    let router = axum::Router::new().route(
        "/scan/{kind}",
        post(|| async {
            axum::Json(serde_json::json!({
                "riskScore": "42",
                "classification": "Suspicious",
                "explanation": "stubbed verdict",
                "recommendations": "be careful"
            }))
        }),
    );
    let base = spawn_stub(router).await;
    crate::clients::ScanClient::new(&scan_config(&base)).unwrap()
}

/// Payment client pointed at a port nothing listens on.
pub fn offline_payment_client() -> crate::clients::PaymentClient {
    crate::clients::PaymentClient::new(&payments_config("http://127.0.0.1:9/")).unwrap()
}

pub fn test_factory(
    db: &SentinelDatabase,
    scan_client: crate::clients::ScanClient,
    payments: crate::clients::PaymentClient,
) -> crate::context::ContextFactory {
    crate::context::ContextFactory {
        db: db.clone(),
        provider: test_provider(db.clone(), Arc::new(RecordingResetSender::default())),
        scan_client,
        payments,
        settings: crate::billing::StoreSettings::default(),
        recent_capacity: 10,
    }
}
