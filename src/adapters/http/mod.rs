//! HTTP adapters - REST API implementations.

pub mod health;
pub mod webhook;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use health::{HealthResponse, SERVICE_NAME};
pub use webhook::{webhook_routes, WebhookAppState, STRIPE_SIGNATURE_HEADER, WEBHOOK_PATHS};

/// Builds the full application router.
///
/// No whole-request timeout is layered on top: every provider and directory
/// call carries its own bound, and an expired bound must still be answered
/// with 200 rather than a transport-level 408.
pub fn build_router(state: WebhookAppState) -> Router {
    webhook_routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
