//! Billing handlers.
//!
//! ## Commands
//! - Processing Stripe billing webhooks into directory entitlements
//!
//! ## Pipeline stages
//! - Resolving a subscription's authoritative price
//! - Reconciling a directory record by email

mod handle_billing_webhook;
mod reconcile_user;
mod resolve_subscription;

pub use handle_billing_webhook::{BillingWebhookHandler, HandleBillingWebhookCommand};
pub use reconcile_user::UserReconciler;
pub use resolve_subscription::{ResolveFailure, ResolvedSubscription, SubscriptionResolver};
