//! Billing domain module.
//!
//! Authenticates Stripe webhook deliveries and decides which entitlement a
//! completed checkout grants.
//!
//! # Module Structure
//!
//! - `signature` - Stripe-Signature verification over an ordered secret set
//! - `webhook_event` - Event envelope and checkout session payload
//! - `dispatcher` - Routing by event type
//! - `price_roles` - Price id → role table
//! - `outcome` - Terminal states of a delivery
//! - `acknowledgement` - Outcome → HTTP status/body

mod acknowledgement;
mod dispatcher;
mod duplicate_policy;
mod errors;
mod outcome;
mod price_roles;
mod signature;
mod webhook_event;

pub use acknowledgement::{
    AckBody, AckResponder, Acknowledgement, INVALID_SIGNATURE_CODE, INVALID_SIGNATURE_MESSAGE,
};
pub use dispatcher::{CheckoutRequest, Dispatch, EventDispatcher};
pub use duplicate_policy::DuplicateEmailPolicy;
pub use errors::VerificationError;
pub use outcome::WebhookOutcome;
pub use price_roles::{PriceRoleMap, PriceTableError, BUILTIN_PRICE_ROLES};
pub use signature::{
    sign_header, EmptySecretSet, SecretSet, SignatureHeader, SignatureVerifier,
    DEFAULT_TOLERANCE_SECS,
};
pub use webhook_event::{
    CheckoutSessionObject, CustomerDetails, ExpandableId, WebhookEvent, WebhookEventData,
    WebhookEventType,
};
