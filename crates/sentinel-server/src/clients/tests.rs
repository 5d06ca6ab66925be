//! Client tests against stub upstream servers.
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use sentinel_core::ContentType;

use super::{InitPayment, PaymentClient, PaymentError, ScanApiError, ScanClient};
use crate::test_helpers::{TEST_API_KEY, payments_config, scan_config, spawn_stub};

type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

/// Scan stub that records `(kind, x-api-key, body)` and answers with a
/// snake_case numeric score.
async fn scan_stub() -> (String, Seen) {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route(
            "/scan/{kind}",
            post(
                |State(seen): State<Seen>,
                 Path(kind): Path<String>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    let key = headers
                        .get("x-api-key")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    seen.lock().unwrap().push((kind.clone(), key, body));
                    if kind == "email" {
                        return (StatusCode::BAD_GATEWAY, "upstream exploded".to_string());
                    }
                    (
                        StatusCode::OK,
                        json!({"risk_score": 64, "classification": "Suspicious"}).to_string(),
                    )
                },
            ),
        )
        .with_state(seen.clone());
    (spawn_stub(router).await, seen)
}

#[tokio::test]
async fn scan_sends_kind_body_and_api_key() {
    let (base, seen) = scan_stub().await;
    let client = ScanClient::new(&scan_config(&base)).unwrap();

    let verdict = client.scan_wallet("0xabc").await.unwrap();
    assert_eq!(verdict.risk_score, "64");
    assert_eq!(verdict.classification, "Suspicious");
    assert_eq!(verdict.explanation, "");

    client.scan_text("hello").await.unwrap();
    client.scan_url("https://x.io").await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0, "wallet");
    assert_eq!(seen[0].1.as_deref(), Some(TEST_API_KEY));
    assert_eq!(seen[0].2, json!({"wallet": "0xabc"}));
    assert_eq!(seen[1].2, json!({"text": "hello"}));
    assert_eq!(seen[2].2, json!({"url": "https://x.io"}));
}

#[tokio::test]
async fn scan_failure_carries_status_and_body() {
    let (base, seen) = scan_stub().await;
    let client = ScanClient::new(&scan_config(base.trim_end_matches('/'))).unwrap();

    let err = client.scan_email("a@b.co").await.unwrap_err();
    match &err {
        ScanApiError::RequestFailed { status, body } => {
            assert_eq!(*status, 502);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "upstream exploded");
    assert_eq!(seen.lock().unwrap()[0].2, json!({"emailId": "a@b.co"}));
}

#[tokio::test]
async fn forward_relays_status_verbatim() {
    let (base, _) = scan_stub().await;
    let client = ScanClient::new(&scan_config(&base)).unwrap();

    let (status, body) = client
        .forward(ContentType::Email, &json!({"emailId": "x@y.z"}))
        .await
        .unwrap();
    assert_eq!(status, 502);
    assert_eq!(body, "upstream exploded");

    assert!(matches!(
        client.forward(ContentType::Qr, &json!({})).await,
        Err(ScanApiError::UnsupportedKind(ContentType::Qr))
    ));
}

#[tokio::test]
async fn empty_failure_body_gets_generic_message() {
    let router = Router::new().route("/scan/text", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let base = spawn_stub(router).await;
    let client = ScanClient::new(&scan_config(&base)).unwrap();
    let err = client.scan_text("hi").await.unwrap_err();
    assert_eq!(err.to_string(), "Request failed");
}

fn payment_stub() -> Router {
    Router::new()
        .route(
            "/paystack/init",
            post(|Json(body): Json<Value>| async move {
                if body["amount"].as_f64() == Some(0.0) {
                    return (StatusCode::BAD_REQUEST, "amount required".to_string());
                }
                (
                    StatusCode::OK,
                    json!({
                        "status": true,
                        "data": {
                            "authorization_url": "https://checkout.test/abc",
                            "reference": format!("ref-{}", body["metadata"]["userId"].as_str().unwrap_or("none")),
                        }
                    })
                    .to_string(),
                )
            }),
        )
        .route(
            "/paystack/verify/{reference}",
            get(|Path(reference): Path<String>| async move {
                match reference.as_str() {
                    "paid ref/1" => (
                        StatusCode::OK,
                        json!({"status": true, "data": {"status": "success"}}).to_string(),
                    ),
                    "pending" => (
                        StatusCode::OK,
                        json!({"status": true, "data": {"status": "ongoing"}}).to_string(),
                    ),
                    _ => (StatusCode::NOT_FOUND, String::new()),
                }
            }),
        )
}

#[tokio::test]
async fn initialize_payment_unwraps_data() {
    let base = spawn_stub(payment_stub()).await;
    let client = PaymentClient::new(&payments_config(&base)).unwrap();

    let auth = client
        .initialize_payment(&InitPayment {
            amount: 1485.0,
            email: "a@b.co".into(),
            metadata: json!({"userId": "u1"}),
        })
        .await
        .unwrap();
    assert_eq!(auth.authorization_url, "https://checkout.test/abc");
    assert_eq!(auth.reference, "ref-u1");

    let err = client
        .initialize_payment(&InitPayment {
            amount: 0.0,
            email: "a@b.co".into(),
            metadata: Value::Null,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InitFailed { status: 400, .. }));
    assert_eq!(err.to_string(), "amount required");
}

#[tokio::test]
async fn verify_payment_encodes_reference_and_checks_status() {
    let base = spawn_stub(payment_stub()).await;
    let client = PaymentClient::new(&payments_config(&base)).unwrap();

    assert!(client.verify_payment("paid ref/1").await.unwrap());
    assert!(!client.verify_payment("pending").await.unwrap());

    let err = client.verify_payment("missing").await.unwrap_err();
    assert!(matches!(err, PaymentError::VerifyFailed { status: 404, .. }));
    assert_eq!(err.to_string(), "Failed to verify payment");
}
