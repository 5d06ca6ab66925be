//! HTTP API.
//!
//! Two surfaces share one router:
//! - unauthenticated pass-through routes (`/api/scan/*`, `/api/paystack/*`)
//!   that keep upstream credentials on the server;
//! - the dashboard API, authenticated with a bearer access token, which
//!   drives the caller's [`AppContext`](crate::context::AppContext).

mod auth_routes;
mod billing_routes;
mod error;
mod extract;
mod health;
mod proxy;
mod scan_routes;
mod state;


use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use extract::{CurrentUser, JsonBody, bearer_token};
pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Pass-through
        .route("/api/scan/{kind}", post(proxy::scan))
        .route("/api/paystack/init", post(proxy::paystack_init))
        .route("/api/paystack/verify/{reference}", get(proxy::paystack_verify))
        // Identity
        .route("/api/auth/signup", post(auth_routes::sign_up))
        .route("/api/auth/signin", post(auth_routes::sign_in))
        .route("/api/auth/signout", post(auth_routes::sign_out))
        .route("/api/auth/refresh", post(auth_routes::refresh))
        .route("/api/auth/reset-password", post(auth_routes::reset_password))
        .route(
            "/api/auth/reset-password/confirm",
            post(auth_routes::confirm_reset),
        )
        .route("/api/auth/password", put(auth_routes::update_password))
        // Profile and billing
        .route(
            "/api/me",
            get(billing_routes::me).patch(billing_routes::update_me),
        )
        .route("/api/plans", get(billing_routes::plans))
        .route(
            "/api/subscription",
            post(billing_routes::subscribe).delete(billing_routes::cancel_subscription),
        )
        .route(
            "/api/subscription/history",
            get(billing_routes::subscription_history),
        )
        .route("/api/payments", post(billing_routes::start_payment))
        .route("/api/payments/pending", get(billing_routes::pending_payment))
        .route(
            "/api/payments/{reference}/verify",
            post(billing_routes::verify_payment),
        )
        // Scans
        .route("/api/scans", post(scan_routes::create_scan))
        .route("/api/scans/qr", post(scan_routes::create_qr_scan))
        .route(
            "/api/scans/latest",
            get(scan_routes::latest_scan).delete(scan_routes::clear_latest_scan),
        )
        .route(
            "/api/scans/recent",
            get(scan_routes::recent_scans).delete(scan_routes::clear_recent_scans),
        )
        // History
        .route(
            "/api/history",
            get(scan_routes::history).delete(scan_routes::clear_history),
        )
        .route("/api/history/stats", get(scan_routes::history_stats))
        .route("/api/history/export", get(scan_routes::export_history))
        .route(
            "/api/history/{id}",
            get(scan_routes::history_item).delete(scan_routes::delete_history_item),
        )
        .route(
            "/api/qr-scans",
            get(scan_routes::qr_scans).delete(scan_routes::clear_qr_scans),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
