//! HTTP handlers for billing webhook endpoints.
//!
//! The body is taken as raw `Bytes`: signature verification covers the exact
//! bytes on the wire, so no JSON extractor may touch it first.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap};

use crate::application::{BillingWebhookHandler, HandleBillingWebhookCommand};
use crate::domain::billing::{AckResponder, Acknowledgement};

use super::dto::STRIPE_SIGNATURE_HEADER;

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhookAppState {
    pub handler: Arc<BillingWebhookHandler>,
}

impl WebhookAppState {
    pub fn new(handler: Arc<BillingWebhookHandler>) -> Self {
        Self { handler }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhook-endpoint - Handle Stripe billing webhooks
pub async fn handle_billing_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Acknowledgement {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandleBillingWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    let result = state.handler.handle(cmd).await;
    AckResponder::respond(&result)
}
