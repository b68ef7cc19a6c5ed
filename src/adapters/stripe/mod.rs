//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe subscription lookups.
//!
//! # Security
//!
//! - The API key is handled via `secrecy::SecretString` and redacted from `Debug`
//! - Subscription ids are validated before being placed in a request path
//!
//! # Configuration
//!
//! - `ENTITLEMENT_SYNC__PAYMENT__STRIPE_API_KEY` (or `STRIPE_SECRET_KEY`)
//! - `ENTITLEMENT_SYNC__PAYMENT__API_VERSION` (optional, defaults to 2023-10-16)

mod mock_payment_provider;
mod stripe_adapter;
mod webhook_types;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{
    StripeConfig, StripePaymentAdapter, DEFAULT_API_BASE_URL, DEFAULT_API_VERSION,
};
pub use webhook_types::{
    StripeApiError, StripeErrorEnvelope, StripePrice, StripeSubscription, StripeSubscriptionItem,
    StripeSubscriptionItems,
};
