//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentProvider` - Authoritative subscription lookups (Stripe)
//! - `UserDirectory` - User record lookup and entitlement writes (Firestore)

mod payment_provider;
mod user_directory;

pub use payment_provider::{
    PaymentError, PaymentErrorCode, PaymentProvider, Subscription, SubscriptionStatus,
};
pub use user_directory::{
    BillingMetadata, DirectoryError, EntitlementUpdate, UserDirectory, UserRecord,
};
