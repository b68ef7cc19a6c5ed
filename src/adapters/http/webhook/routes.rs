//! Axum router configuration for webhook endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_billing_webhook, WebhookAppState};
use crate::adapters::http::health::health;

/// Paths the billing webhook is mounted at.
pub const WEBHOOK_PATHS: [&str; 3] = ["/webhook-endpoint", "/webhook", "/api/webhook"];

/// Create the webhook router.
///
/// # Routes
/// - `GET /` - Liveness
/// - `POST /webhook-endpoint` - Handle Stripe webhooks
/// - `POST /webhook`, `POST /api/webhook` - Same handler, legacy paths
pub fn webhook_routes() -> Router<WebhookAppState> {
    WEBHOOK_PATHS.iter().fold(
        Router::new().route("/", get(health)),
        |router, path| router.route(path, post(handle_billing_webhook)),
    )
}
