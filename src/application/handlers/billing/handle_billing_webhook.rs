//! BillingWebhookHandler - Command handler for Stripe billing webhooks.
//!
//! Runs one delivery through verify → dispatch → resolve → map → reconcile
//! and reports where it stopped. Only a verification failure is an `Err`;
//! every later stage ends in a `WebhookOutcome` that the HTTP layer
//! acknowledges with 200.

use tracing::{field, Instrument};
use uuid::Uuid;

use crate::domain::billing::{
    Dispatch, EventDispatcher, PriceRoleMap, SignatureVerifier, VerificationError, WebhookEvent,
    WebhookOutcome,
};

use super::reconcile_user::UserReconciler;
use super::resolve_subscription::SubscriptionResolver;

/// Command to handle a billing webhook.
#[derive(Debug, Clone)]
pub struct HandleBillingWebhookCommand {
    /// Raw webhook payload, byte-for-byte as received.
    pub payload: Vec<u8>,
    /// Stripe-Signature header, if present.
    pub signature: Option<String>,
}

/// Handler for processing billing webhooks.
///
/// Constructed once at startup and shared across requests; holds no
/// per-request state.
pub struct BillingWebhookHandler {
    verifier: SignatureVerifier,
    dispatcher: EventDispatcher,
    resolver: SubscriptionResolver,
    price_roles: PriceRoleMap,
    reconciler: UserReconciler,
}

impl BillingWebhookHandler {
    pub fn new(
        verifier: SignatureVerifier,
        resolver: SubscriptionResolver,
        price_roles: PriceRoleMap,
        reconciler: UserReconciler,
    ) -> Self {
        Self {
            verifier,
            dispatcher: EventDispatcher::new(),
            resolver,
            price_roles,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleBillingWebhookCommand,
    ) -> Result<WebhookOutcome, VerificationError> {
        let delivery_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "billing_webhook",
            %delivery_id,
            event_id = field::Empty,
            event_type = field::Empty,
        );

        self.process(cmd).instrument(span).await
    }

    async fn process(
        &self,
        cmd: HandleBillingWebhookCommand,
    ) -> Result<WebhookOutcome, VerificationError> {
        // 1. Authenticate raw bytes and parse the event
        let event = match self.authenticate(&cmd) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    reason = e.reason_code(),
                    error = %e,
                    payload_bytes = cmd.payload.len(),
                    "Rejected webhook delivery"
                );
                return Err(e);
            }
        };

        let span = tracing::Span::current();
        span.record("event_id", event.id.as_str());
        span.record("event_type", event.event_type.as_str());

        // 2. Route and run the pipeline
        let outcome = self.reconcile_event(&event).await;
        log_outcome(&outcome, event.livemode);
        Ok(outcome)
    }

    fn authenticate(
        &self,
        cmd: &HandleBillingWebhookCommand,
    ) -> Result<WebhookEvent, VerificationError> {
        let signature = cmd
            .signature
            .as_deref()
            .ok_or(VerificationError::MissingHeader)?;
        self.verifier.verify(&cmd.payload, signature)
    }

    async fn reconcile_event(&self, event: &WebhookEvent) -> WebhookOutcome {
        let checkout = match self.dispatcher.dispatch(event) {
            Dispatch::Ignored { event_type } => return WebhookOutcome::Ignored { event_type },
            Dispatch::Malformed { reason } => return WebhookOutcome::MalformedEvent { reason },
            Dispatch::Checkout(checkout) => checkout,
        };

        tracing::debug!(
            session_id = checkout.session_id.as_deref().unwrap_or(""),
            subscription_ref = %checkout.subscription_ref,
            "Processing completed checkout"
        );

        // 3. Fetch authoritative price
        let resolved = match self.resolver.resolve(&checkout.subscription_ref).await {
            Ok(resolved) => resolved,
            Err(failure) => {
                return WebhookOutcome::UnresolvedSubscription {
                    subscription_id: checkout.subscription_ref,
                    reason: failure.reason,
                    retryable: failure.retryable,
                }
            }
        };

        // 4. Map price to role
        let role = match self.price_roles.role_for(&resolved.price_id) {
            Some(role) => role,
            None => {
                return WebhookOutcome::UnknownEntitlement {
                    subscription_id: resolved.subscription_id,
                    price_id: resolved.price_id,
                }
            }
        };

        // 5. Overwrite the directory record
        self.reconciler
            .reconcile(
                &checkout.email,
                role,
                &resolved.price_id,
                &resolved.subscription_id,
            )
            .await
    }
}

fn log_outcome(outcome: &WebhookOutcome, livemode: bool) {
    let kind = outcome.kind();
    match outcome {
        WebhookOutcome::Updated {
            user_id,
            role,
            price_id,
            subscription_id,
        } => tracing::info!(
            outcome = kind,
            livemode,
            %user_id,
            %role,
            %price_id,
            %subscription_id,
            "Entitlement updated"
        ),
        WebhookOutcome::Ignored { .. } => {
            tracing::debug!(outcome = kind, "Event type has no handler")
        }
        WebhookOutcome::MalformedEvent { reason } => {
            tracing::warn!(outcome = kind, %reason, "Checkout event skipped")
        }
        WebhookOutcome::UnresolvedSubscription {
            subscription_id,
            reason,
            retryable,
        } => {
            if *retryable {
                tracing::error!(
                    outcome = kind,
                    %subscription_id,
                    %reason,
                    retryable,
                    "Subscription lookup failed; replay from the provider dashboard"
                )
            } else {
                tracing::warn!(
                    outcome = kind,
                    %subscription_id,
                    %reason,
                    retryable,
                    "Subscription could not be resolved"
                )
            }
        }
        WebhookOutcome::UnknownEntitlement {
            subscription_id,
            price_id,
        } => tracing::warn!(
            outcome = kind,
            %subscription_id,
            %price_id,
            "Price has no entitlement role"
        ),
        WebhookOutcome::UserNotFound => {
            tracing::warn!(outcome = kind, "No directory record for checkout email")
        }
        WebhookOutcome::AmbiguousUser { matches } => tracing::warn!(
            outcome = kind,
            matches,
            "Several directory records share checkout email; nothing written"
        ),
        WebhookOutcome::ReconciliationError { reason, retryable } => tracing::error!(
            outcome = kind,
            %reason,
            retryable,
            "Directory update failed; replay from the provider dashboard"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::directory::InMemoryUserDirectory;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::{sign_header, SecretSet};
    use crate::ports::{PaymentError, Subscription, UserRecord};
    use secrecy::SecretString;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const SECRET: &str = "whsec_handler_test";
    const PRICE: &str = "price_1SfKHZP1mCgTuXtUMhCioSyC";

    struct Fixture {
        handler: BillingWebhookHandler,
        provider: MockPaymentProvider,
        directory: Arc<InMemoryUserDirectory>,
    }

    fn fixture() -> Fixture {
        let provider = MockPaymentProvider::with_subscriptions([Subscription::active("sub_1", PRICE)]);
        let directory = Arc::new(InMemoryUserDirectory::with_records([UserRecord::new(
            "u1", "a@x.com",
        )]));
        let secrets = SecretSet::new(vec![SecretString::new(SECRET.to_string())]).unwrap();

        let handler = BillingWebhookHandler::new(
            SignatureVerifier::new(secrets),
            SubscriptionResolver::new(Arc::new(provider.clone()), Duration::from_secs(1)),
            PriceRoleMap::builtin(),
            UserReconciler::new(directory.clone(), Duration::from_secs(1)),
        );

        Fixture {
            handler,
            provider,
            directory,
        }
    }

    fn signed(event: serde_json::Value) -> HandleBillingWebhookCommand {
        let payload = event.to_string().into_bytes();
        let signature = sign_header(SECRET, chrono::Utc::now().timestamp(), &payload);
        HandleBillingWebhookCommand {
            payload,
            signature: Some(signature),
        }
    }

    fn checkout_event(object: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "data": {"object": object},
            "livemode": false
        })
    }

    #[tokio::test]
    async fn completed_checkout_updates_record() {
        let f = fixture();

        let outcome = f
            .handler
            .handle(signed(checkout_event(json!({
                "customer_details": {"email": "a@x.com"},
                "subscription": "sub_1"
            }))))
            .await
            .unwrap();

        assert!(outcome.is_update());
        let record = f.directory.get("u1").await.unwrap();
        assert_eq!(record.role.as_deref(), Some("premium"));
        assert_eq!(record.billing.price_id.as_deref(), Some(PRICE));
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let f = fixture();
        let mut cmd = signed(checkout_event(json!({})));
        cmd.signature = None;

        let err = f.handler.handle(cmd).await.unwrap_err();

        assert_eq!(err, VerificationError::MissingHeader);
        assert_eq!(f.provider.call_count("get_subscription"), 0);
    }

    #[tokio::test]
    async fn unhandled_type_is_ignored_without_lookups() {
        let f = fixture();

        let outcome = f
            .handler
            .handle(signed(json!({
                "id": "evt_2",
                "type": "customer.subscription.updated",
                "data": {"object": {"id": "sub_1"}}
            })))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                event_type: "customer.subscription.updated".into()
            }
        );
        assert_eq!(f.provider.call_count("get_subscription"), 0);
    }

    #[tokio::test]
    async fn payload_price_is_never_trusted() {
        let f = fixture();

        // Embedded plan data points at an unknown price; provider says otherwise.
        f.handler
            .handle(signed(checkout_event(json!({
                "customer_details": {"email": "a@x.com"},
                "subscription": {"id": "sub_1", "items": {"data": [{"price": {"id": "price_stale"}}]}}
            }))))
            .await
            .unwrap();

        let record = f.directory.get("u1").await.unwrap();
        assert_eq!(record.billing.price_id.as_deref(), Some(PRICE));
    }

    #[tokio::test]
    async fn unknown_price_leaves_record_unchanged() {
        let f = fixture();
        f.provider.add_subscription(Subscription::active("sub_2", "price_not_sold"));

        let outcome = f
            .handler
            .handle(signed(checkout_event(json!({
                "customer_email": "a@x.com",
                "subscription": "sub_2"
            }))))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::UnknownEntitlement {
                subscription_id: "sub_2".into(),
                price_id: "price_not_sold".into(),
            }
        );
        assert_eq!(f.directory.get("u1").await.unwrap(), UserRecord::new("u1", "a@x.com"));
    }

    #[tokio::test]
    async fn provider_failure_is_unresolved_subscription() {
        let f = fixture();
        f.provider.fail_get_subscription(PaymentError::rate_limited("slow down"));

        let outcome = f
            .handler
            .handle(signed(checkout_event(json!({
                "customer_details": {"email": "a@x.com"},
                "subscription": "sub_1"
            }))))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::UnresolvedSubscription { retryable: true, .. }
        ));
        assert_eq!(f.directory.write_count(), 0);
    }

    #[tokio::test]
    async fn malformed_checkout_skips_provider() {
        let f = fixture();

        let outcome = f
            .handler
            .handle(signed(checkout_event(json!({"subscription": "sub_1"}))))
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::MalformedEvent { .. }));
        assert_eq!(f.provider.call_count("get_subscription"), 0);
    }
}
