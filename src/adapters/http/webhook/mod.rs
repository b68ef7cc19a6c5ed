//! Billing webhook HTTP adapter.

mod dto;
mod handlers;
mod routes;

pub use dto::STRIPE_SIGNATURE_HEADER;
pub use handlers::{handle_billing_webhook, WebhookAppState};
pub use routes::{webhook_routes, WEBHOOK_PATHS};
