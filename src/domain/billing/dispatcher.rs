//! Routes verified webhook events by type.
//!
//! Only checkout completion has a handling path. Everything else is
//! acknowledged and dropped so that newly enabled event types never cause
//! redelivery storms.

use super::webhook_event::{CheckoutSessionObject, WebhookEvent, WebhookEventType};

/// Everything the reconciliation pipeline needs from a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub email: String,
    pub subscription_ref: String,
    pub session_id: Option<String>,
}

/// Routing decision for a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Event type has no handling path.
    Ignored { event_type: String },
    /// Checkout completed with both an email and a subscription reference.
    Checkout(CheckoutRequest),
    /// Handled type, but the object lacks a required field.
    Malformed { reason: String },
}

/// Stateless event router.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDispatcher;

impl EventDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn dispatch(&self, event: &WebhookEvent) -> Dispatch {
        match event.parsed_type() {
            WebhookEventType::CheckoutSessionCompleted => self.dispatch_checkout(event),
            WebhookEventType::Unhandled => Dispatch::Ignored {
                event_type: event.event_type.clone(),
            },
        }
    }

    fn dispatch_checkout(&self, event: &WebhookEvent) -> Dispatch {
        let session: CheckoutSessionObject = match event.deserialize_object() {
            Ok(session) => session,
            Err(e) => {
                return Dispatch::Malformed {
                    reason: format!("checkout session object: {}", e),
                }
            }
        };

        let email = match session.email() {
            Some(email) => email.to_string(),
            None => {
                return Dispatch::Malformed {
                    reason: "missing customer email".to_string(),
                }
            }
        };

        let subscription_ref = match session.subscription_ref() {
            Some(id) => id.to_string(),
            None => {
                return Dispatch::Malformed {
                    reason: "missing subscription reference".to_string(),
                }
            }
        };

        Dispatch::Checkout(CheckoutRequest {
            email,
            subscription_ref,
            session_id: session.id,
        })
    }
}
